// src/bin/inspect.rs
// ============================================================================
// MIF INSPECTOR - Inspecciona estructura de archivos MIFv1
// ============================================================================
//
// Uso: mif-inspect modelo.mif [--manifest]
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use mif_convert::export::{HeaderFlags, MifHeader, SectionTable, SECTION_NAMES};

#[derive(Parser)]
#[command(name = "mif-inspect")]
#[command(about = "Inspect MIFv1 file structure")]
struct Args {
    /// MIF file to inspect
    file: PathBuf,

    /// Show manifest JSON
    #[arg(long)]
    manifest: bool,
}

const FLAG_NAMES: [(u32, &str); 4] = [
    (0, "HAS_QUANTIZED_WEIGHTS"),
    (1, "HAS_FLOAT16_WEIGHTS"),
    (2, "HAS_SELECT_OPS"),
    (3, "HAS_CUSTOM_OPS"),
];

fn format_size(size: u64) -> String {
    if size == 0 {
        "vacío".to_string()
    } else if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / 1024.0 / 1024.0)
    }
}

fn make_bar(size: u64, max_size: u64, width: usize) -> String {
    if max_size == 0 || size == 0 {
        "░".repeat(width)
    } else {
        let ratio = (size as f64 / max_size as f64).min(1.0);
        let filled = ((ratio * width as f64) as usize).max(1);
        "█".repeat(filled) + &"░".repeat(width.saturating_sub(filled))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Cannot open {}", args.file.display()))?;

    let header = MifHeader::from_bytes(&bytes)?;
    let magic_ok = header.validate().is_ok();

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  MIFv1 INSPECTOR");
    println!("════════════════════════════════════════════════════════════════");
    println!("  Archivo:      {}", args.file.display());
    println!("  Tamaño real:  {}", format_size(bytes.len() as u64));
    println!();

    // ═══════════════════════════════════════════════════════════════
    // HEADER
    // ═══════════════════════════════════════════════════════════════
    let magic_str: String = header
        .magic
        .iter()
        .map(|&b| if b == 0 { '.' } else { b as char })
        .collect();
    let status = if magic_ok { "✓" } else { "✗ INVÁLIDO" };

    println!("  HEADER (64 bytes)");
    println!("  ──────────────────────────────────────────────");
    println!("  Magic:      {:?} {}", magic_str, status);
    println!("  Versión:    {}.{}", header.version_major, header.version_minor);
    println!("  Secciones:  {}", header.section_count);
    println!("  File Size:  {}", format_size(header.file_size));
    println!("  Checksum:   0x{:08X}", header.checksum);
    println!();

    // ═══════════════════════════════════════════════════════════════
    // FLAGS
    // ═══════════════════════════════════════════════════════════════
    println!("  FLAGS");
    println!("  ──────────────────────────────────────────────");
    let mut any = false;
    for (bit, name) in FLAG_NAMES.iter() {
        if header.flags.has(1 << bit) {
            println!("  ✓ {}", name);
            any = true;
        }
    }
    if !any {
        println!("  (ningún flag activo)");
    }
    println!();

    // ═══════════════════════════════════════════════════════════════
    // TABLA DE SECCIONES
    // ═══════════════════════════════════════════════════════════════
    let table_start = header.section_table_offset as usize;
    let table = SectionTable::from_bytes(&bytes[table_start..table_start + SectionTable::SIZE])?;
    let max_size = table.entries.iter().map(|e| e.size).max().unwrap_or(1);

    println!("  SECCIONES");
    println!("  ──────────────────────────────────────────────");
    for (idx, entry) in table.entries.iter().enumerate() {
        let bar = make_bar(entry.size, max_size, 25);
        println!(
            "  [{}] {:10} {} {:>10}  @0x{:X}",
            idx,
            SECTION_NAMES[idx],
            bar,
            format_size(entry.size),
            entry.offset
        );
    }
    println!();

    // Marcar el uso de HeaderFlags para dejar claro qué significa cada bit
    if header.flags.has(HeaderFlags::HAS_QUANTIZED_WEIGHTS) {
        println!("  Modelo con pesos cuantizados");
        println!();
    }

    // ═══════════════════════════════════════════════════════════════
    // MANIFEST (opcional)
    // ═══════════════════════════════════════════════════════════════
    if args.manifest && header.manifest_size > 0 {
        let start = header.manifest_offset as usize;
        let end = start + header.manifest_size as usize;
        let manifest: serde_json::Value = serde_json::from_slice(&bytes[start..end])
            .context("Invalid manifest JSON")?;

        println!("  MANIFEST JSON");
        println!("  ──────────────────────────────────────────────");
        let pretty = serde_json::to_string_pretty(&manifest).unwrap_or_default();
        for line in pretty.lines().take(40) {
            println!("  {}", line);
        }
        if pretty.lines().count() > 40 {
            println!("  ... (truncado)");
        }
    }

    Ok(())
}
