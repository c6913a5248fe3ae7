// src/export/header.rs
// ============================================================================
// MIFv1 HEADER - Estructura de 64 bytes + tabla de secciones
// ============================================================================

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Magic bytes para MIFv1
pub const MAGIC: &[u8; 8] = b"MIFv1\x00\x00\x00";

pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

/// Número fijo de secciones
pub const SECTION_COUNT: usize = 5;

/// Tamaño del header
pub const HEADER_SIZE: u32 = 64;

/// Tamaño de una entrada de la tabla de secciones
pub const SECTION_ENTRY_SIZE: usize = 32;

/// Índices de sección
pub const SECTION_OP_CODES: usize = 0;
pub const SECTION_TENSORS: usize = 1;
pub const SECTION_BUFFERS: usize = 2;
pub const SECTION_IO: usize = 3;
pub const SECTION_MANIFEST: usize = 4;

pub const SECTION_NAMES: [&str; SECTION_COUNT] = [
    "op_codes", // 0
    "tensors",  // 1
    "buffers",  // 2
    "io",       // 3
    "manifest", // 4
];

/// Flags del header
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderFlags(pub u32);

impl HeaderFlags {
    pub const HAS_QUANTIZED_WEIGHTS: u32 = 1 << 0;
    pub const HAS_FLOAT16_WEIGHTS: u32 = 1 << 1;
    pub const HAS_SELECT_OPS: u32 = 1 << 2;
    pub const HAS_CUSTOM_OPS: u32 = 1 << 3;

    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn has(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }
}

/// Header MIFv1 (64 bytes)
#[derive(Debug, Clone)]
pub struct MifHeader {
    pub magic: [u8; 8],
    pub version_major: u16,
    pub version_minor: u16,
    pub flags: HeaderFlags,
    pub section_count: u32,
    pub header_size: u32,
    pub section_table_offset: u64,
    pub manifest_offset: u64,
    pub manifest_size: u64,
    pub file_size: u64,
    pub checksum: u32,
    pub reserved: u32,
}

impl Default for MifHeader {
    fn default() -> Self {
        Self {
            magic: *MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            flags: HeaderFlags::default(),
            section_count: SECTION_COUNT as u32,
            header_size: HEADER_SIZE,
            section_table_offset: HEADER_SIZE as u64,
            manifest_offset: 0,
            manifest_size: 0,
            file_size: 0,
            checksum: 0,
            reserved: 0,
        }
    }
}

impl MifHeader {
    /// Serializa a bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.magic);
        buf.write_u16::<LittleEndian>(self.version_major).unwrap();
        buf.write_u16::<LittleEndian>(self.version_minor).unwrap();
        buf.write_u32::<LittleEndian>(self.flags.0).unwrap();
        buf.write_u32::<LittleEndian>(self.section_count).unwrap();
        buf.write_u32::<LittleEndian>(self.header_size).unwrap();
        buf.write_u64::<LittleEndian>(self.section_table_offset).unwrap();
        buf.write_u64::<LittleEndian>(self.manifest_offset).unwrap();
        buf.write_u64::<LittleEndian>(self.manifest_size).unwrap();
        buf.write_u64::<LittleEndian>(self.file_size).unwrap();
        buf.write_u32::<LittleEndian>(self.checksum).unwrap();
        buf.write_u32::<LittleEndian>(self.reserved).unwrap();
        buf
    }

    /// Deserializa desde bytes
    pub fn from_bytes(data: &[u8]) -> std::io::Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut magic = [0u8; 8];
        cursor.read_exact(&mut magic)?;

        Ok(Self {
            magic,
            version_major: cursor.read_u16::<LittleEndian>()?,
            version_minor: cursor.read_u16::<LittleEndian>()?,
            flags: HeaderFlags(cursor.read_u32::<LittleEndian>()?),
            section_count: cursor.read_u32::<LittleEndian>()?,
            header_size: cursor.read_u32::<LittleEndian>()?,
            section_table_offset: cursor.read_u64::<LittleEndian>()?,
            manifest_offset: cursor.read_u64::<LittleEndian>()?,
            manifest_size: cursor.read_u64::<LittleEndian>()?,
            file_size: cursor.read_u64::<LittleEndian>()?,
            checksum: cursor.read_u32::<LittleEndian>()?,
            reserved: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Valida el header
    pub fn validate(&self) -> Result<(), String> {
        if &self.magic != MAGIC {
            return Err(format!("Invalid magic: {:?}", self.magic));
        }
        if self.version_major != VERSION_MAJOR {
            return Err(format!(
                "Unsupported version: {}.{}",
                self.version_major, self.version_minor
            ));
        }
        if self.section_count != SECTION_COUNT as u32 {
            return Err(format!(
                "Invalid section count: {} (expected {})",
                self.section_count, SECTION_COUNT
            ));
        }
        if self.header_size != HEADER_SIZE {
            return Err(format!("Invalid header size: {}", self.header_size));
        }
        Ok(())
    }
}

/// Entrada de la tabla de secciones (32 bytes)
#[derive(Debug, Clone, Default)]
pub struct SectionEntry {
    pub section_id: u32,
    pub section_kind: u32,
    pub offset: u64,
    pub size: u64,
    pub checksum: u64,
}

impl SectionEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SECTION_ENTRY_SIZE);
        buf.write_u32::<LittleEndian>(self.section_id).unwrap();
        buf.write_u32::<LittleEndian>(self.section_kind).unwrap();
        buf.write_u64::<LittleEndian>(self.offset).unwrap();
        buf.write_u64::<LittleEndian>(self.size).unwrap();
        buf.write_u64::<LittleEndian>(self.checksum).unwrap();
        buf
    }

    pub fn from_bytes(data: &[u8]) -> std::io::Result<Self> {
        let mut cursor = Cursor::new(data);
        Ok(Self {
            section_id: cursor.read_u32::<LittleEndian>()?,
            section_kind: cursor.read_u32::<LittleEndian>()?,
            offset: cursor.read_u64::<LittleEndian>()?,
            size: cursor.read_u64::<LittleEndian>()?,
            checksum: cursor.read_u64::<LittleEndian>()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Tabla de secciones completa (5 × 32 = 160 bytes)
pub struct SectionTable {
    pub entries: [SectionEntry; SECTION_COUNT],
}

impl Default for SectionTable {
    fn default() -> Self {
        Self {
            entries: std::array::from_fn(|i| SectionEntry {
                section_id: i as u32,
                section_kind: i as u32,
                ..Default::default()
            }),
        }
    }
}

impl SectionTable {
    pub const SIZE: usize = SECTION_COUNT * SECTION_ENTRY_SIZE;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        for entry in &self.entries {
            buf.extend(entry.to_bytes());
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> std::io::Result<Self> {
        let mut entries: [SectionEntry; SECTION_COUNT] = Default::default();
        for (i, entry) in entries.iter_mut().enumerate() {
            let start = i * SECTION_ENTRY_SIZE;
            *entry = SectionEntry::from_bytes(&data[start..start + SECTION_ENTRY_SIZE])?;
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = MifHeader::default();
        header.flags.set(HeaderFlags::HAS_QUANTIZED_WEIGHTS);
        header.manifest_offset = 1024;
        header.manifest_size = 333;
        header.file_size = 2048;
        header.checksum = 0xDEADBEEF;

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 64);

        let back = MifHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back.magic, *MAGIC);
        assert!(back.flags.has(HeaderFlags::HAS_QUANTIZED_WEIGHTS));
        assert!(!back.flags.has(HeaderFlags::HAS_CUSTOM_OPS));
        assert_eq!(back.manifest_offset, 1024);
        assert_eq!(back.manifest_size, 333);
        assert_eq!(back.file_size, 2048);
        assert_eq!(back.checksum, 0xDEADBEEF);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_magic() {
        let mut header = MifHeader::default();
        header.magic = *b"NOPE\x00\x00\x00\x00";
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_section_table_roundtrip() {
        let mut table = SectionTable::default();
        table.entries[SECTION_BUFFERS].offset = 224;
        table.entries[SECTION_BUFFERS].size = 4096;
        table.entries[SECTION_BUFFERS].checksum = 42;

        let bytes = table.to_bytes();
        assert_eq!(bytes.len(), SectionTable::SIZE);

        let back = SectionTable::from_bytes(&bytes).unwrap();
        assert_eq!(back.entries[SECTION_BUFFERS].offset, 224);
        assert_eq!(back.entries[SECTION_BUFFERS].size, 4096);
        assert!(back.entries[SECTION_OP_CODES].is_empty());
    }
}
