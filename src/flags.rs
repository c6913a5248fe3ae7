// src/flags.rs
// ============================================================================
// FLAGS - Registros de configuración del caller
// ============================================================================
//
// Dos bundles inmutables: ModelFlags describe el modelo (entradas, salidas),
// ConvertFlags la conversión (precisión, toggles de emisión, volcados).
// Ambos aceptan el schema legacy completo; los campos sin efecto en este
// pipeline se reportan como warnings, nunca como errores.
//
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dtype::IoDataType;

fn default_std() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Declaración de una entrada del grafo
#[derive(Debug, Clone, Deserialize)]
pub struct InputFlag {
    pub name: String,
    #[serde(default)]
    pub data_type: IoDataType,
    #[serde(default)]
    pub shape: Vec<i64>,
    #[serde(default)]
    pub mean_value: f64,
    #[serde(default = "default_std")]
    pub std_value: f64,
}

/// Flags a nivel de modelo
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelFlags {
    #[serde(default)]
    pub input_arrays: Vec<InputFlag>,
    #[serde(default)]
    pub output_arrays: Vec<String>,
    // Legacy, aceptados pero sin efecto aquí
    #[serde(default)]
    pub change_concat_input_ranges: bool,
    #[serde(default)]
    pub allow_nonexistent_arrays: bool,
}

impl ModelFlags {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let flags: ModelFlags = serde_json::from_slice(&data)
            .with_context(|| format!("Invalid model flags JSON in {}", path.display()))?;
        Ok(flags)
    }
}

/// Flags a nivel de conversión
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertFlags {
    pub inference_type: IoDataType,
    pub inference_input_type: IoDataType,
    pub post_training_quantize: bool,
    pub quantize_to_float16: bool,
    pub allow_custom_ops: bool,
    pub enable_select_ops: bool,
    pub force_select_ops: bool,
    pub lower_tensor_list_ops: bool,
    pub dump_graphviz_dir: Option<PathBuf>,
    // Legacy, aceptados pero sin efecto aquí
    pub dump_graphviz_include_video: bool,
    pub output_format: Option<String>,
    pub default_ranges_min: Option<f64>,
    pub default_ranges_max: Option<f64>,
    pub drop_control_dependency: bool,
    pub reorder_across_fake_quant: bool,
}

impl Default for ConvertFlags {
    fn default() -> Self {
        Self {
            inference_type: IoDataType::Float,
            inference_input_type: IoDataType::Unknown,
            post_training_quantize: false,
            quantize_to_float16: false,
            allow_custom_ops: false,
            enable_select_ops: false,
            force_select_ops: false,
            lower_tensor_list_ops: default_true(),
            dump_graphviz_dir: None,
            dump_graphviz_include_video: false,
            output_format: None,
            default_ranges_min: None,
            default_ranges_max: None,
            drop_control_dependency: false,
            reorder_across_fake_quant: false,
        }
    }
}

impl ConvertFlags {
    pub fn has_dump_graphviz_dir(&self) -> bool {
        self.dump_graphviz_dir.is_some()
    }
}

/// Flag aceptado por el schema legacy pero sin efecto en este pipeline.
///
/// El traductor los recolecta y los devuelve junto al resultado; decidir
/// cómo exponerlos (log, print, nada) es del caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagWarning {
    pub flag: &'static str,
    pub reason: String,
}

impl FlagWarning {
    pub fn new(flag: &'static str, reason: impl Into<String>) -> Self {
        Self {
            flag,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_flags_from_json() {
        let json = r#"{
            "input_arrays": [
                {"name": "input0", "shape": [1, 224, 224, 3], "mean_value": 128.0, "std_value": 128.0},
                {"name": "input1", "data_type": "int32"}
            ],
            "output_arrays": ["logits", "probs"]
        }"#;
        let flags: ModelFlags = serde_json::from_str(json).unwrap();
        assert_eq!(flags.input_arrays.len(), 2);
        assert_eq!(flags.input_arrays[0].std_value, 128.0);
        // data_type omitido → Unknown
        assert_eq!(flags.input_arrays[0].data_type, IoDataType::Unknown);
        assert_eq!(flags.input_arrays[1].data_type, IoDataType::Int32);
        // std por defecto 1.0 (nunca 0)
        assert_eq!(flags.input_arrays[1].std_value, 1.0);
        assert_eq!(flags.output_arrays, vec!["logits", "probs"]);
    }

    #[test]
    fn test_convert_flags_defaults() {
        let flags: ConvertFlags = serde_json::from_str("{}").unwrap();
        assert_eq!(flags.inference_type, IoDataType::Float);
        assert_eq!(flags.inference_input_type, IoDataType::Unknown);
        assert!(flags.lower_tensor_list_ops);
        assert!(!flags.post_training_quantize);
        assert!(!flags.has_dump_graphviz_dir());
    }
}
