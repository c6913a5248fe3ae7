// src/passes/mod.rs
// ============================================================================
// PASSES - Pass manager y construcción del pipeline
// ============================================================================
//
// El pass manager es secuencial: cada pass corre a término antes del
// siguiente y el primer fallo aborta. Un pass puede paralelizar por dentro
// (el kernel de cuantización usa rayon), pero la orquestación no.
//
// ============================================================================

pub mod legalize;
pub mod lower_tensor_list;
pub mod prune;
pub mod quantize_weights;

use thiserror::Error;

use crate::ir::Module;
use crate::quant::QuantSpec;

pub use legalize::LegalizePass;
pub use lower_tensor_list::LowerTensorListPass;
pub use prune::PrunePass;
pub use quantize_weights::QuantizeWeightsPass;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("pass '{pass}' failed: {message}")]
    Failed { pass: &'static str, message: String },
}

impl PassError {
    pub fn new(pass: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            pass,
            message: message.into(),
        }
    }
}

/// Transformación sobre un módulo. Muta in place.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, module: &mut Module) -> Result<(), PassError>;
}

/// Secuencia ordenada de passes
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Corre todos los passes en orden; primer fallo aborta
    pub fn run(&self, module: &mut Module) -> Result<(), PassError> {
        for pass in &self.passes {
            log::debug!("running pass '{}' ({} ops)", pass.name(), module.len());
            pass.run(module)?;
        }
        Ok(())
    }
}

/// Configuración del pipeline, derivada de la quant spec y los toggles
#[derive(Debug, Clone)]
pub struct PassConfig {
    pub quant: QuantSpec,
    pub emit_builtin_ops: bool,
    pub lower_tensor_list_ops: bool,
}

/// Construye el pipeline de conversión estándar
pub fn build_pipeline(config: &PassConfig) -> PassManager {
    let mut pm = PassManager::new();

    if config.lower_tensor_list_ops {
        pm.add_pass(LowerTensorListPass);
    }
    if config.emit_builtin_ops {
        pm.add_pass(LegalizePass);
    }
    if config.quant.weight_quantization {
        pm.add_pass(QuantizeWeightsPass::new(config.quant.clone()));
    }
    pm.add_pass(PrunePass);

    pm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;

    fn config(weight_quant: bool, lower: bool, builtin: bool) -> PassConfig {
        let mut quant = QuantSpec::default();
        quant.weight_quantization = weight_quant;
        quant.inference_type = if weight_quant {
            DataType::QInt8
        } else {
            DataType::Float32
        };
        PassConfig {
            quant,
            emit_builtin_ops: builtin,
            lower_tensor_list_ops: lower,
        }
    }

    #[test]
    fn test_pipeline_composition_full() {
        let pm = build_pipeline(&config(true, true, true));
        assert_eq!(
            pm.pass_names(),
            vec![
                "lower-tensor-list",
                "legalize",
                "quantize-weights",
                "prune"
            ]
        );
    }

    #[test]
    fn test_pipeline_composition_minimal() {
        let pm = build_pipeline(&config(false, false, false));
        assert_eq!(pm.pass_names(), vec!["prune"]);
    }

    #[test]
    fn test_pass_manager_stops_on_failure() {
        struct FailPass;
        impl Pass for FailPass {
            fn name(&self) -> &'static str {
                "fail"
            }
            fn run(&self, _: &mut Module) -> Result<(), PassError> {
                Err(PassError::new("fail", "boom"))
            }
        }
        struct MarkPass;
        impl Pass for MarkPass {
            fn name(&self) -> &'static str {
                "mark"
            }
            fn run(&self, module: &mut Module) -> Result<(), PassError> {
                module.name = "marked".to_string();
                Ok(())
            }
        }

        let mut pm = PassManager::new();
        pm.add_pass(FailPass);
        pm.add_pass(MarkPass);

        let mut module = Module::new("main");
        let err = pm.run(&mut module).unwrap_err();
        assert!(err.to_string().contains("boom"));
        // El segundo pass nunca corrió
        assert_eq!(module.name, "main");
    }
}
