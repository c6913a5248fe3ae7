// src/graph/mod.rs
// ============================================================================
// GRAPHDEF - Modelo wire del grafo de computación serializado
// ============================================================================

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::dtype::IoDataType;

/// Grafo serializado: lista plana de nodos en orden de declaración
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDef {
    #[serde(default)]
    pub node: Vec<NodeDef>,
}

/// Nodo del grafo con tipo de operación, nombre y atributos tipados
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    pub op: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub attr: BTreeMap<String, AttrValue>,
}

/// Atributo tipado de un nodo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Type(IoDataType),
    Shape(Vec<i64>),
    F(f64),
    I(i64),
    B(bool),
    S(String),
    Tensor(TensorAttr),
}

/// Payload constante embebido en un atributo (nodos Const)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TensorAttr {
    pub dtype: IoDataType,
    #[serde(default)]
    pub shape: Vec<i64>,
    #[serde(default)]
    pub float_val: Vec<f32>,
    #[serde(default)]
    pub int_val: Vec<i64>,
    /// Payload empaquetado (f16/int8 tras cuantización de pesos)
    #[serde(default)]
    pub byte_val: Vec<u8>,
}

impl GraphDef {
    /// Carga un GraphDef desde archivo JSON (mmap para grafos grandes)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };
        let graph: GraphDef = serde_json::from_slice(&mmap)
            .with_context(|| format!("Invalid graph JSON in {}", path.display()))?;
        Ok(graph)
    }

    /// Lookup nombre-de-placeholder → dtype declarado.
    ///
    /// Lo usa el traductor de flags para rellenar tipos de entrada que el
    /// caller omitió.
    pub fn placeholder_dtypes(&self) -> HashMap<&str, IoDataType> {
        let mut map = HashMap::new();
        for node in &self.node {
            if node.op == "Placeholder" {
                if let Some(AttrValue::Type(dtype)) = node.attr.get("dtype") {
                    map.insert(node.name.as_str(), *dtype);
                }
            }
        }
        map
    }

    pub fn find_node(&self, name: &str) -> Option<&NodeDef> {
        self.node.iter().find(|n| n.name == name)
    }
}

/// Trazas de origen por nodo, para decorar errores del importador
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(default)]
    pub traces: HashMap<String, String>,
}

impl DebugInfo {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let info: DebugInfo = serde_json::from_slice(&data)
            .with_context(|| format!("Invalid debug info JSON in {}", path.display()))?;
        Ok(info)
    }

    pub fn trace(&self, node: &str) -> Option<&str> {
        self.traces.get(node).map(|s| s.as_str())
    }
}
