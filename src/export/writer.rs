// src/export/writer.rs
// ============================================================================
// MIF WRITER - Construye el contenedor MIFv1 en memoria
// ============================================================================

use xxhash_rust::xxh3::xxh3_64;

use super::header::*;
use super::ExportError;

/// Builder del contenedor. A diferencia de un writer a disco, acumula el
/// buffer completo: el contrato del exportador devuelve bytes y deja el I/O
/// al caller.
pub struct MifWriter {
    buf: Vec<u8>,
    header: MifHeader,
    table: SectionTable,
}

impl MifWriter {
    pub fn new() -> Self {
        let header = MifHeader::default();
        let table = SectionTable::default();

        let mut buf = Vec::new();
        // Placeholders de header y tabla; se parchean en finish()
        buf.extend(header.to_bytes());
        buf.extend(table.to_bytes());

        Self { buf, header, table }
    }

    /// Alinea el buffer a múltiplo de 32
    fn align_32(&mut self) {
        let remainder = self.buf.len() % 32;
        if remainder != 0 {
            self.buf.extend(std::iter::repeat(0u8).take(32 - remainder));
        }
    }

    /// Escribe una sección completa y registra offset/size/checksum
    pub fn write_section(&mut self, section_id: usize, data: &[u8]) -> Result<(), ExportError> {
        if section_id >= SECTION_COUNT {
            return Err(ExportError::InvalidSection(section_id));
        }

        self.align_32();
        let entry = &mut self.table.entries[section_id];
        entry.offset = self.buf.len() as u64;
        entry.size = data.len() as u64;
        entry.checksum = xxh3_64(data);

        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.header.flags.set(flag);
    }

    /// Escribe el manifest, parchea header y tabla, y devuelve el buffer
    pub fn finish(mut self, manifest: &serde_json::Value) -> Result<Vec<u8>, ExportError> {
        let manifest_bytes = serde_json::to_vec_pretty(manifest)?;
        self.write_section(SECTION_MANIFEST, &manifest_bytes)?;

        self.header.manifest_offset = self.table.entries[SECTION_MANIFEST].offset;
        self.header.manifest_size = self.table.entries[SECTION_MANIFEST].size;
        self.header.file_size = self.buf.len() as u64;

        // CRC32 sobre header (con checksum a cero) + tabla de secciones
        self.header.checksum = 0;
        let checksum = {
            let mut data = self.header.to_bytes();
            data.extend(self.table.to_bytes());
            crc32fast::hash(&data)
        };
        self.header.checksum = checksum;

        // Parchear header y tabla al inicio del buffer
        let header_bytes = self.header.to_bytes();
        self.buf[..HEADER_SIZE as usize].copy_from_slice(&header_bytes);
        let table_bytes = self.table.to_bytes();
        let table_start = HEADER_SIZE as usize;
        self.buf[table_start..table_start + SectionTable::SIZE].copy_from_slice(&table_bytes);

        Ok(self.buf)
    }
}

impl Default for MifWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_layout() {
        let mut writer = MifWriter::new();
        writer.write_section(SECTION_OP_CODES, b"opcodes!").unwrap();
        writer.write_section(SECTION_BUFFERS, &[7u8; 100]).unwrap();

        let bytes = writer.finish(&serde_json::json!({"format": "MIFv1"})).unwrap();

        let header = MifHeader::from_bytes(&bytes).unwrap();
        header.validate().unwrap();
        assert_eq!(header.file_size as usize, bytes.len());

        let table_start = HEADER_SIZE as usize;
        let table =
            SectionTable::from_bytes(&bytes[table_start..table_start + SectionTable::SIZE])
                .unwrap();

        // Secciones alineadas a 32 y con checksum correcto
        let op = &table.entries[SECTION_OP_CODES];
        assert_eq!(op.offset % 32, 0);
        assert_eq!(op.size, 8);
        let payload = &bytes[op.offset as usize..(op.offset + op.size) as usize];
        assert_eq!(payload, b"opcodes!");
        assert_eq!(op.checksum, xxh3_64(b"opcodes!"));

        // Manifest recuperable desde el header
        let manifest = &bytes[header.manifest_offset as usize
            ..(header.manifest_offset + header.manifest_size) as usize];
        let json: serde_json::Value = serde_json::from_slice(manifest).unwrap();
        assert_eq!(json["format"], "MIFv1");

        // Sección no escrita queda vacía
        assert!(table.entries[SECTION_IO].is_empty());
    }

    #[test]
    fn test_invalid_section_id() {
        let mut writer = MifWriter::new();
        assert!(matches!(
            writer.write_section(99, b"x").unwrap_err(),
            ExportError::InvalidSection(99)
        ));
    }

    #[test]
    fn test_header_checksum_matches() {
        let writer = MifWriter::new();
        let bytes = writer.finish(&serde_json::json!({})).unwrap();

        let mut header = MifHeader::from_bytes(&bytes).unwrap();
        let stored = header.checksum;
        header.checksum = 0;

        let table_start = HEADER_SIZE as usize;
        let mut data = header.to_bytes();
        data.extend_from_slice(&bytes[table_start..table_start + SectionTable::SIZE]);
        assert_eq!(crc32fast::hash(&data), stored);
    }
}
