// src/main.rs
// ============================================================================
// MIF-CONVERT CLI
// ============================================================================
//
// Uso simple:
//   mif-convert graph.json --model-flags flags.json -o model.mif
//
// Uso con cuantización post-training:
//   mif-convert graph.json \
//       --model-flags flags.json \
//       --post-training-quantize \
//       -o model_q8.mif
//
// ============================================================================

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use mif_convert::{
    convert, ConvertFlags, DebugInfo, GraphDef, IoDataType, ModelFlags,
};

#[derive(Parser, Debug)]
#[command(name = "mif-convert")]
#[command(about = "Convert serialized compute graphs to MIFv1 models")]
#[command(version = "0.1.0")]
struct Args {
    /// Input graph (JSON GraphDef)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Model flags JSON (input/output array declarations)
    #[arg(long, required = true)]
    model_flags: PathBuf,

    /// Optional per-node debug info JSON
    #[arg(long)]
    debug_info: Option<PathBuf>,

    /// Output MIF file
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Inference type (float, int8, quantized_uint8, ...)
    #[arg(long)]
    inference_type: Option<String>,

    /// Inference input type (overrides inference type when non-float)
    #[arg(long)]
    inference_input_type: Option<String>,

    /// Post-training weight quantization
    #[arg(long)]
    post_training_quantize: bool,

    /// Quantize weights to float16 instead of int8
    #[arg(long)]
    quantize_to_float16: bool,

    /// Allow custom ops in the exported model
    #[arg(long)]
    allow_custom_ops: bool,

    /// Enable select-op fallback for non-builtin ops
    #[arg(long)]
    enable_select_ops: bool,

    /// Force every op through the select path
    #[arg(long)]
    force_select_ops: bool,

    /// Dump DOT graphs (before/after the pipeline) into this directory
    #[arg(long)]
    dump_graphviz_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_io_type(arg: &Option<String>, default: IoDataType) -> Result<IoDataType> {
    match arg {
        Some(s) => IoDataType::from_str_tag(s)
            .ok_or_else(|| anyhow::anyhow!("Invalid data type: {}", s)),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let convert_flags = ConvertFlags {
        inference_type: parse_io_type(&args.inference_type, IoDataType::Float)?,
        inference_input_type: parse_io_type(&args.inference_input_type, IoDataType::Unknown)?,
        post_training_quantize: args.post_training_quantize,
        quantize_to_float16: args.quantize_to_float16,
        allow_custom_ops: args.allow_custom_ops,
        enable_select_ops: args.enable_select_ops,
        force_select_ops: args.force_select_ops,
        dump_graphviz_dir: args.dump_graphviz_dir.clone(),
        ..Default::default()
    };

    println!("═══════════════════════════════════════════════════════════════");
    println!("  MIF CONVERTER v0.1.0");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Graph:       {}", args.graph.display());
    println!("  Model flags: {}", args.model_flags.display());
    println!("  Output:      {}", args.output.display());
    if args.post_training_quantize {
        let mode = if args.quantize_to_float16 { "float16" } else { "int8" };
        println!("  Quant:       post-training ({})", mode);
    }
    println!("═══════════════════════════════════════════════════════════════");

    // ══════════════════════════════════════════════════════════════════════
    // CARGAR ENTRADAS
    // ══════════════════════════════════════════════════════════════════════

    let graph = GraphDef::from_file(&args.graph)?;
    let model_flags = ModelFlags::from_file(&args.model_flags)?;
    let debug_info = match &args.debug_info {
        Some(path) => DebugInfo::from_file(path)?,
        None => DebugInfo::default(),
    };

    if args.verbose {
        println!("  Nodes:   {}", graph.node.len());
        println!("  Inputs:  {}", model_flags.input_arrays.len());
        println!("  Outputs: {}", model_flags.output_arrays.len());
    }

    // ══════════════════════════════════════════════════════════════════════
    // CONVERTIR
    // ══════════════════════════════════════════════════════════════════════

    println!("\n[CONVERT] Running pipeline...");
    let conversion = convert(&model_flags, &convert_flags, &debug_info, &graph)?;

    for warning in &conversion.warnings {
        log::warn!("Ignored {}: {}", warning.flag, warning.reason);
    }

    std::fs::write(&args.output, &conversion.model)?;

    // ══════════════════════════════════════════════════════════════════════
    // SUMMARY
    // ══════════════════════════════════════════════════════════════════════

    let elapsed = start.elapsed();
    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  CONVERSION COMPLETE");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Time:     {:.2}s", elapsed.as_secs_f64());
    println!("  Size:     {:.1} KB", conversion.model.len() as f64 / 1024.0);
    println!("  Warnings: {}", conversion.warnings.len());
    println!("  Output:   {}", args.output.display());
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}
