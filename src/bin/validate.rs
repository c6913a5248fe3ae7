// src/bin/validate.rs
// ============================================================================
// MIF VALIDATOR - Validación de integridad de archivos MIFv1
// ============================================================================
//
// Valida:
//   - Header (magic, versión, tamaños, CRC32)
//   - Tabla de secciones (offsets dentro del archivo, alineación)
//   - Checksums XXH3 de cada sección
//   - Manifest JSON parseable
//
// Uso:
//   mif-validate modelo.mif [-v]
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use xxhash_rust::xxh3::xxh3_64;

use mif_convert::export::{MifHeader, SectionTable, SECTION_NAMES};

#[derive(Parser)]
#[command(name = "mif-validate")]
#[command(about = "Validate MIFv1 file integrity")]
struct Args {
    /// MIF file to validate
    file: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

struct Report {
    checks: usize,
    failures: usize,
}

impl Report {
    fn new() -> Self {
        Self { checks: 0, failures: 0 }
    }

    fn check(&mut self, ok: bool, label: &str, detail: String) {
        self.checks += 1;
        if ok {
            println!("  ✓ {}", label);
        } else {
            self.failures += 1;
            println!("  ✗ {} — {}", label, detail);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Cannot open {}", args.file.display()))?;

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  MIFv1 VALIDATOR");
    println!("════════════════════════════════════════════════════════════════");
    println!("  Archivo: {}", args.file.display());
    println!();

    let mut report = Report::new();

    // ═══════════════════════════════════════════════════════════════
    // HEADER
    // ═══════════════════════════════════════════════════════════════
    let header = MifHeader::from_bytes(&bytes)?;

    report.check(
        header.validate().is_ok(),
        "header",
        header.validate().err().unwrap_or_default(),
    );
    report.check(
        header.file_size as usize == bytes.len(),
        "file size",
        format!("header says {}, file is {}", header.file_size, bytes.len()),
    );

    // CRC32 sobre header (checksum a cero) + tabla
    let table_start = header.section_table_offset as usize;
    let table = SectionTable::from_bytes(&bytes[table_start..table_start + SectionTable::SIZE])?;
    let expected_crc = {
        let mut h = header.clone();
        h.checksum = 0;
        let mut data = h.to_bytes();
        data.extend(table.to_bytes());
        crc32fast::hash(&data)
    };
    report.check(
        expected_crc == header.checksum,
        "header checksum",
        format!("expected 0x{:08X}, stored 0x{:08X}", expected_crc, header.checksum),
    );

    // ═══════════════════════════════════════════════════════════════
    // SECCIONES
    // ═══════════════════════════════════════════════════════════════
    for (idx, entry) in table.entries.iter().enumerate() {
        if entry.is_empty() {
            if args.verbose {
                println!("  - {} (vacía)", SECTION_NAMES[idx]);
            }
            continue;
        }

        let start = entry.offset as usize;
        let end = start + entry.size as usize;
        let in_bounds = end <= bytes.len();
        report.check(
            in_bounds,
            &format!("section '{}' bounds", SECTION_NAMES[idx]),
            format!("[{}, {}) beyond file end {}", start, end, bytes.len()),
        );
        if !in_bounds {
            continue;
        }

        report.check(
            entry.offset % 32 == 0,
            &format!("section '{}' alignment", SECTION_NAMES[idx]),
            format!("offset {} not 32-aligned", entry.offset),
        );

        let actual = xxh3_64(&bytes[start..end]);
        report.check(
            actual == entry.checksum,
            &format!("section '{}' checksum", SECTION_NAMES[idx]),
            format!("expected 0x{:016X}, stored 0x{:016X}", actual, entry.checksum),
        );
    }

    // ═══════════════════════════════════════════════════════════════
    // MANIFEST
    // ═══════════════════════════════════════════════════════════════
    if header.manifest_size > 0 {
        let start = header.manifest_offset as usize;
        let end = start + header.manifest_size as usize;
        let parsed = serde_json::from_slice::<serde_json::Value>(&bytes[start..end]);
        report.check(
            parsed.is_ok(),
            "manifest JSON",
            parsed.err().map(|e| e.to_string()).unwrap_or_default(),
        );
    }

    println!();
    println!("════════════════════════════════════════════════════════════════");
    if report.failures == 0 {
        println!("  VÁLIDO ({} checks)", report.checks);
    } else {
        println!("  INVÁLIDO ({}/{} checks fallaron)", report.failures, report.checks);
    }
    println!("════════════════════════════════════════════════════════════════");

    if report.failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
