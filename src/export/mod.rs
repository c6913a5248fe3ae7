// src/export/mod.rs
// ============================================================================
// EXPORT - Serializa el Module final al contenedor MIFv1
// ============================================================================
//
// Última etapa del pipeline. Clasifica cada op según los toggles de emisión
// (builtin / select / custom), vuelca tablas de ops y tensores, los payloads
// constantes, el orden de entradas/salidas y un manifest JSON. Devuelve el
// buffer completo; escribirlo a disco es cosa del caller.
//
// ============================================================================

pub mod header;
pub mod writer;

use std::collections::HashMap;

use byteorder::{LittleEndian, WriteBytesExt};
use thiserror::Error;

use crate::graph::{AttrValue, TensorAttr};
use crate::ir::Module;
use crate::passes::legalize::is_builtin;
use crate::quant::QuantSpec;
use header::*;
use writer::MifWriter;

pub use header::{HeaderFlags, MifHeader, SectionTable, SECTION_NAMES};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("op '{op}' ({name}) is outside the builtin op set and select/custom emission is disabled")]
    UnsupportedOp { name: String, op: String },

    #[error("invalid section id {0}")]
    InvalidSection(usize),

    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("malformed container: {0}")]
    Malformed(String),
}

/// Toggles de emisión de ops, derivados de los flags de conversión
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub emit_builtin_ops: bool,
    pub emit_select_ops: bool,
    pub emit_custom_ops: bool,
}

/// Clase de op-code en el contenedor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCodeKind {
    Builtin = 0,
    Select = 1,
    Custom = 2,
}

fn classify(name: &str, op: &str, opts: &ExportOptions) -> Result<OpCodeKind, ExportError> {
    // Los pseudo-ops estructurales siempre son emitibles
    if op == "Placeholder" || op == "Const" {
        return Ok(OpCodeKind::Builtin);
    }
    if opts.emit_builtin_ops && is_builtin(op) {
        return Ok(OpCodeKind::Builtin);
    }
    if opts.emit_select_ops {
        return Ok(OpCodeKind::Select);
    }
    if opts.emit_custom_ops {
        return Ok(OpCodeKind::Custom);
    }
    Err(ExportError::UnsupportedOp {
        name: name.to_string(),
        op: op.to_string(),
    })
}

/// Payload serializable de un tensor constante
fn const_payload(tensor: &TensorAttr) -> Vec<u8> {
    if !tensor.byte_val.is_empty() {
        return tensor.byte_val.clone();
    }
    if !tensor.float_val.is_empty() {
        let mut buf = Vec::with_capacity(tensor.float_val.len() * 4);
        for &v in &tensor.float_val {
            buf.write_f32::<LittleEndian>(v).unwrap();
        }
        return buf;
    }
    let mut buf = Vec::with_capacity(tensor.int_val.len() * 8);
    for &v in &tensor.int_val {
        buf.write_i64::<LittleEndian>(v).unwrap();
    }
    buf
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.write_u16::<LittleEndian>(s.len() as u16).unwrap();
    buf.extend_from_slice(s.as_bytes());
}

/// Exporta el módulo al formato binario MIFv1.
///
/// El orden de la sección io replica `module.inputs` / `module.outputs`
/// verbatim: ese orden es la calling convention del modelo.
pub fn export_module(
    module: &Module,
    quant: &QuantSpec,
    opts: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    // ── Tabla de op-codes (orden de primera aparición) ──
    let mut op_codes: Vec<(OpCodeKind, String)> = Vec::new();
    let mut op_code_index: HashMap<String, u32> = HashMap::new();
    let mut has_select = false;
    let mut has_custom = false;

    for op in &module.ops {
        if op_code_index.contains_key(&op.op) {
            continue;
        }
        let kind = classify(&op.name, &op.op, opts)?;
        match kind {
            OpCodeKind::Select => has_select = true,
            OpCodeKind::Custom => has_custom = true,
            OpCodeKind::Builtin => {}
        }
        op_code_index.insert(op.op.clone(), op_codes.len() as u32);
        op_codes.push((kind, op.op.clone()));
    }

    let mut op_codes_section = Vec::new();
    op_codes_section
        .write_u32::<LittleEndian>(op_codes.len() as u32)
        .unwrap();
    for (kind, name) in &op_codes {
        op_codes_section.push(*kind as u8);
        write_str(&mut op_codes_section, name);
    }

    // ── Buffers constantes + tabla de tensores ──
    let mut buffers = Vec::new();
    let mut tensors_section = Vec::new();
    tensors_section
        .write_u32::<LittleEndian>(module.ops.len() as u32)
        .unwrap();

    for op in &module.ops {
        write_str(&mut tensors_section, &op.name);
        write_str(&mut tensors_section, op.ty.dtype.name());
        tensors_section
            .write_u32::<LittleEndian>(op_code_index[&op.op])
            .unwrap();

        let shape = op.ty.shape.clone().unwrap_or_default();
        tensors_section
            .write_u32::<LittleEndian>(shape.len() as u32)
            .unwrap();
        for dim in &shape {
            tensors_section.write_i64::<LittleEndian>(*dim).unwrap();
        }

        // Solo los Const llevan payload
        let (offset, size) = match op.attrs.get("value") {
            Some(AttrValue::Tensor(t)) if op.is_const() => {
                let payload = const_payload(t);
                let offset = buffers.len() as u64;
                buffers.extend_from_slice(&payload);
                (offset, payload.len() as u64)
            }
            _ => (0, 0),
        };
        tensors_section.write_u64::<LittleEndian>(offset).unwrap();
        tensors_section.write_u64::<LittleEndian>(size).unwrap();
    }

    // ── Sección io: orden verbatim de declaración ──
    let mut io_section = Vec::new();
    io_section
        .write_u32::<LittleEndian>(module.inputs.len() as u32)
        .unwrap();
    for name in &module.inputs {
        write_str(&mut io_section, name);
    }
    io_section
        .write_u32::<LittleEndian>(module.outputs.len() as u32)
        .unwrap();
    for name in &module.outputs {
        write_str(&mut io_section, name);
    }

    // ── Ensamblar contenedor ──
    let mut writer = MifWriter::new();
    writer.write_section(SECTION_OP_CODES, &op_codes_section)?;
    writer.write_section(SECTION_TENSORS, &tensors_section)?;
    writer.write_section(SECTION_BUFFERS, &buffers)?;
    writer.write_section(SECTION_IO, &io_section)?;

    if quant.weight_quantization {
        writer.set_flag(HeaderFlags::HAS_QUANTIZED_WEIGHTS);
        if quant.inference_type == crate::dtype::DataType::Float16 {
            writer.set_flag(HeaderFlags::HAS_FLOAT16_WEIGHTS);
        }
    }
    if has_select {
        writer.set_flag(HeaderFlags::HAS_SELECT_OPS);
    }
    if has_custom {
        writer.set_flag(HeaderFlags::HAS_CUSTOM_OPS);
    }

    let manifest = serde_json::json!({
        "format": "MIFv1",
        "generator": "mif-convert 0.1.0",
        "created": chrono::Utc::now().to_rfc3339(),
        "module": module.name,
        "inference_type": quant.inference_type.name(),
        "inference_input_type": quant.inference_input_type.name(),
        "weight_quantization": quant.weight_quantization,
        "ops": module.ops.len(),
        "op_codes": op_codes.len(),
        "inputs": module.inputs,
        "outputs": module.outputs,
    });

    writer.finish(&manifest)
}

// ============================================================================
// LECTURA (runtime / inspección / tests)
// ============================================================================

fn read_str(data: &[u8], pos: &mut usize) -> Result<String, ExportError> {
    if *pos + 2 > data.len() {
        return Err(ExportError::Malformed("truncated string length".into()));
    }
    let len = u16::from_le_bytes([data[*pos], data[*pos + 1]]) as usize;
    *pos += 2;
    if *pos + len > data.len() {
        return Err(ExportError::Malformed("truncated string payload".into()));
    }
    let s = String::from_utf8(data[*pos..*pos + len].to_vec())
        .map_err(|_| ExportError::Malformed("non-utf8 string".into()))?;
    *pos += len;
    Ok(s)
}

fn section_slice(bytes: &[u8], section_id: usize) -> Result<&[u8], ExportError> {
    if bytes.len() < HEADER_SIZE as usize + SectionTable::SIZE {
        return Err(ExportError::Malformed("container too small".into()));
    }
    let table_start = HEADER_SIZE as usize;
    let table = SectionTable::from_bytes(&bytes[table_start..table_start + SectionTable::SIZE])
        .map_err(|e| ExportError::Malformed(e.to_string()))?;
    let entry = &table.entries[section_id];
    let start = entry.offset as usize;
    let end = start + entry.size as usize;
    if end > bytes.len() {
        return Err(ExportError::Malformed(format!(
            "section '{}' out of bounds",
            SECTION_NAMES[section_id]
        )));
    }
    Ok(&bytes[start..end])
}

/// Recupera (inputs, outputs) de un contenedor MIFv1, en el orden emitido
pub fn read_io_arrays(bytes: &[u8]) -> Result<(Vec<String>, Vec<String>), ExportError> {
    let data = section_slice(bytes, SECTION_IO)?;
    let mut pos = 0usize;

    let read_u32 = |data: &[u8], pos: &mut usize| -> Result<u32, ExportError> {
        if *pos + 4 > data.len() {
            return Err(ExportError::Malformed("truncated io section".into()));
        }
        let v = u32::from_le_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
        *pos += 4;
        Ok(v)
    };

    let n_inputs = read_u32(data, &mut pos)?;
    let mut inputs = Vec::with_capacity(n_inputs as usize);
    for _ in 0..n_inputs {
        inputs.push(read_str(data, &mut pos)?);
    }

    let n_outputs = read_u32(data, &mut pos)?;
    let mut outputs = Vec::with_capacity(n_outputs as usize);
    for _ in 0..n_outputs {
        outputs.push(read_str(data, &mut pos)?);
    }

    Ok((inputs, outputs))
}
