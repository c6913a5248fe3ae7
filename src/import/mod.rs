// src/import/mod.rs
// ============================================================================
// IMPORTER - GraphDef serializado → Module IR
// ============================================================================
//
// El importador es la primera etapa del pipeline: materializa el grafo wire
// en un Module sobre el que corren los passes. Valida la estructura (arrays
// declarados que no existen, operandos colgantes) y aplica las
// normalizaciones legacy antes de que nadie más toque el módulo.
//
// ============================================================================

use std::collections::HashSet;

use thiserror::Error;

use crate::dtype::DataType;
use crate::graph::{AttrValue, DebugInfo, GraphDef};
use crate::ir::{Module, Operation, TensorType};

/// Aliases de ops legacy → nombre actual (aplicado con `upgrade_legacy`)
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("AddV2", "Add"),
    ("PadV2", "Pad"),
    ("ConcatV2", "Concat"),
    ("BatchMatMulV2", "BatchMatMul"),
    ("SelectV2", "Select"),
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input array '{name}' not found in graph{trace}")]
    MissingInput { name: String, trace: String },

    #[error("output array '{name}' not found in graph{trace}")]
    MissingOutput { name: String, trace: String },

    #[error("node '{node}' references undefined input '{input}'")]
    DanglingInput { node: String, input: String },

    #[error("duplicate input array '{0}'")]
    DuplicateInput(String),

    #[error("input array with empty name")]
    EmptyInputName,

    #[error("output array with empty name")]
    EmptyOutputName,

    #[error("input spec arity mismatch: {names} names, {dtypes} dtypes, {shapes} shapes")]
    ArityMismatch {
        names: usize,
        dtypes: usize,
        shapes: usize,
    },

    #[error("unknown dtype name '{dtype}' for input array '{name}'")]
    BadDtypeName { name: String, dtype: String },
}

/// Spec de una entrada del grafo, derivada de los flags
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub name: String,
    pub dtype: DataType,
    pub shape: Vec<i64>,
}

/// Configuración del importador
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub inputs: Vec<InputSpec>,
    pub output_arrays: Vec<String>,
    pub prune_unused_nodes: bool,
    pub convert_legacy_fed_inputs: bool,
    pub graph_as_function: bool,
    pub upgrade_legacy: bool,
}

/// Parsea las ternas paralelas (nombre, dtype-name, shape) en InputSpecs.
///
/// Los tres slices deben tener la misma longitud y los nombres ser únicos y
/// no vacíos. Un dtype-name desconocido es error; "invalid" es válido (el
/// centinela viaja tal cual, lo comprueban etapas posteriores).
pub fn parse_input_specs(
    names: &[String],
    dtypes: &[String],
    shapes: &[Vec<i64>],
) -> Result<Vec<InputSpec>, ImportError> {
    if names.len() != dtypes.len() || names.len() != shapes.len() {
        return Err(ImportError::ArityMismatch {
            names: names.len(),
            dtypes: dtypes.len(),
            shapes: shapes.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(names.len());

    for i in 0..names.len() {
        let name = names[i].trim();
        if name.is_empty() {
            return Err(ImportError::EmptyInputName);
        }
        if !seen.insert(name.to_string()) {
            return Err(ImportError::DuplicateInput(name.to_string()));
        }
        let dtype = DataType::from_name(&dtypes[i]).ok_or_else(|| ImportError::BadDtypeName {
            name: name.to_string(),
            dtype: dtypes[i].clone(),
        })?;
        specs.push(InputSpec {
            name: name.to_string(),
            dtype,
            shape: shapes[i].clone(),
        });
    }

    Ok(specs)
}

/// Resuelve los nombres de salida declarados, preservando el orden verbatim.
///
/// Acepta sufijos de índice de tensor ("logits:0") y los normaliza al nombre
/// del nodo productor.
pub fn parse_output_arrays(outputs: &[String]) -> Result<Vec<String>, ImportError> {
    let mut arrays = Vec::with_capacity(outputs.len());
    for raw in outputs {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ImportError::EmptyOutputName);
        }
        // "nombre:0" → "nombre"
        let base = match name.rsplit_once(':') {
            Some((head, idx)) if idx.chars().all(|c| c.is_ascii_digit()) => head,
            _ => name,
        };
        arrays.push(base.to_string());
    }
    Ok(arrays)
}

fn trace_suffix(debug_info: &DebugInfo, name: &str) -> String {
    match debug_info.trace(name) {
        Some(t) => format!(" (declared at {})", t),
        None => String::new(),
    }
}

/// Quita el prefijo de dependencia de control y el sufijo de índice
fn operand_base(input: &str) -> &str {
    let input = input.strip_prefix('^').unwrap_or(input);
    match input.rsplit_once(':') {
        Some((head, idx)) if idx.chars().all(|c| c.is_ascii_digit()) => head,
        _ => input,
    }
}

fn node_result_type(node: &crate::graph::NodeDef) -> TensorType {
    // dtype: atributo "dtype" (placeholders), "T" (genérico) o el payload
    // del tensor constante
    let dtype = match (node.attr.get("dtype"), node.attr.get("T"), node.attr.get("value")) {
        (Some(AttrValue::Type(t)), _, _) => DataType::from_io(*t),
        (_, Some(AttrValue::Type(t)), _) => DataType::from_io(*t),
        (_, _, Some(AttrValue::Tensor(t))) => DataType::from_io(t.dtype),
        _ => DataType::Invalid,
    };

    let shape = match (node.attr.get("shape"), node.attr.get("value")) {
        (Some(AttrValue::Shape(s)), _) => Some(s.clone()),
        (_, Some(AttrValue::Tensor(t))) => Some(t.shape.clone()),
        _ => None,
    };

    TensorType { dtype, shape }
}

/// Importa el grafo a un Module IR.
///
/// El orden de `Module::inputs` replica exactamente `config.inputs`; el de
/// `Module::outputs` replica `config.output_arrays`. Ese orden es semántico:
/// define la calling convention del modelo exportado.
pub fn import_graph(
    graph: &GraphDef,
    debug_info: &DebugInfo,
    config: &ImportConfig,
) -> Result<Module, ImportError> {
    let node_names: HashSet<&str> = graph.node.iter().map(|n| n.name.as_str()).collect();

    let mut module = Module::new(if config.graph_as_function { "graph_fn" } else { "main" });

    for node in &graph.node {
        // Normalización legacy del kind de op
        let mut op_kind = node.op.as_str();
        if config.convert_legacy_fed_inputs && op_kind == "FedInput" {
            op_kind = "Placeholder";
        }
        if config.upgrade_legacy {
            if let Some((_, upgraded)) = LEGACY_ALIASES.iter().find(|(old, _)| *old == op_kind) {
                op_kind = upgraded;
            }
        }

        // Validar operandos
        let mut inputs = Vec::with_capacity(node.input.len());
        for raw in &node.input {
            let base = operand_base(raw);
            if !node_names.contains(base) {
                return Err(ImportError::DanglingInput {
                    node: node.name.clone(),
                    input: raw.clone(),
                });
            }
            // Las dependencias de control no son operandos de datos
            if raw.starts_with('^') {
                continue;
            }
            inputs.push(base.to_string());
        }

        module.push_op(Operation {
            name: node.name.clone(),
            op: op_kind.to_string(),
            inputs,
            attrs: node.attr.clone(),
            ty: node_result_type(node),
        });
    }

    // Aplicar specs de entrada, en orden de declaración
    for spec in &config.inputs {
        let op = module.get_mut(&spec.name).ok_or_else(|| ImportError::MissingInput {
            name: spec.name.clone(),
            trace: trace_suffix(debug_info, &spec.name),
        })?;
        op.ty.dtype = spec.dtype;
        if !spec.shape.is_empty() {
            op.ty.shape = Some(spec.shape.clone());
        }
        module.inputs.push(spec.name.clone());
    }

    // Salidas declaradas, orden verbatim
    for name in &config.output_arrays {
        if !module.contains(name) {
            return Err(ImportError::MissingOutput {
                name: name.clone(),
                trace: trace_suffix(debug_info, name),
            });
        }
        module.outputs.push(name.clone());
    }

    if config.prune_unused_nodes {
        prune_unreachable(&mut module);
    }

    Ok(module)
}

/// Elimina operaciones no alcanzables desde las salidas (las entradas
/// declaradas se conservan siempre)
fn prune_unreachable(module: &mut Module) {
    let mut live: HashSet<String> = module.outputs.iter().cloned().collect();
    let mut stack: Vec<String> = module.outputs.clone();

    while let Some(name) = stack.pop() {
        if let Some(op) = module.get(&name) {
            for input in &op.inputs {
                if live.insert(input.clone()) {
                    stack.push(input.clone());
                }
            }
        }
    }

    for input in &module.inputs {
        live.insert(input.clone());
    }

    module.retain_ops(|op| live.contains(&op.name));
}
