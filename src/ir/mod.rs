// src/ir/mod.rs
// ============================================================================
// IR - Representación intermedia del compilador
// ============================================================================
//
// Un Module es la unidad sobre la que corre el pass pipeline: lista de
// operaciones en orden topológico (el orden de importación), más los nombres
// de entradas y salidas externas. Las operaciones se referencian por nombre,
// igual que en el grafo de origen.
//
// ============================================================================

use std::collections::BTreeMap;

use crate::dtype::DataType;
use crate::graph::AttrValue;

/// Tipo de tensor resultado de una operación
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorType {
    pub dtype: DataType,
    /// None = shape desconocida (se resuelve en passes posteriores)
    pub shape: Option<Vec<i64>>,
}

impl TensorType {
    pub fn new(dtype: DataType) -> Self {
        Self { dtype, shape: None }
    }

    pub fn with_shape(mut self, shape: Vec<i64>) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn unknown() -> Self {
        Self::new(DataType::Invalid)
    }
}

/// Operación del módulo
#[derive(Debug, Clone)]
pub struct Operation {
    /// Nombre del resultado (único dentro del módulo)
    pub name: String,
    /// Kind de operación (tras legalización, nombre del op builtin)
    pub op: String,
    /// Operandos, por nombre de resultado de otra operación
    pub inputs: Vec<String>,
    pub attrs: BTreeMap<String, AttrValue>,
    pub ty: TensorType,
}

impl Operation {
    pub fn new(name: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            inputs: vec![],
            attrs: BTreeMap::new(),
            ty: TensorType::unknown(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_type(mut self, ty: TensorType) -> Self {
        self.ty = ty;
        self
    }

    pub fn is_const(&self) -> bool {
        self.op == "Const"
    }

    pub fn is_placeholder(&self) -> bool {
        self.op == "Placeholder"
    }
}

/// Módulo IR: propiedad exclusiva del orquestador durante una conversión
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    /// Entradas externas, en el orden declarado por el caller
    pub inputs: Vec<String>,
    /// Salidas externas, orden verbatim de declaración (define la calling
    /// convention del modelo exportado)
    pub outputs: Vec<String>,
    pub ops: Vec<Operation>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push_op(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.ops.iter().find(|o| o.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Operation> {
        self.ops.iter_mut().find(|o| o.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.iter().any(|o| o.name == name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Conserva solo las operaciones que cumplen el predicado
    pub fn retain_ops<F: FnMut(&Operation) -> bool>(&mut self, f: F) {
        self.ops.retain(f);
    }
}
