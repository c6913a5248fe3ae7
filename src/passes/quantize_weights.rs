// src/passes/quantize_weights.rs
// ============================================================================
// QUANTIZE WEIGHTS - Cuantización post-training de constantes
// ============================================================================

use super::{Pass, PassError};
use crate::dtype::DataType;
use crate::graph::AttrValue;
use crate::ir::Module;
use crate::quant::{quantize_f16, quantize_int8, QuantSpec};

/// Tensores por debajo de este tamaño no se cuantizan (biases, escalares:
/// el ahorro no compensa el error)
const MIN_ELEMENTS: usize = 64;

/// Reescribe los payloads f32 de los nodos Const según la quant spec:
/// Float16 → payload f16, cualquier otro modo post-training → int8 afín.
pub struct QuantizeWeightsPass {
    spec: QuantSpec,
}

impl QuantizeWeightsPass {
    pub fn new(spec: QuantSpec) -> Self {
        Self { spec }
    }
}

impl Pass for QuantizeWeightsPass {
    fn name(&self) -> &'static str {
        "quantize-weights"
    }

    fn run(&self, module: &mut Module) -> Result<(), PassError> {
        let to_f16 = self.spec.inference_type == DataType::Float16;
        let mut quantized = 0usize;

        for op in &mut module.ops {
            if !op.is_const() || op.ty.dtype != DataType::Float32 {
                continue;
            }

            let int8_scale;
            {
                let Some(AttrValue::Tensor(tensor)) = op.attrs.get_mut("value") else {
                    continue;
                };
                if tensor.float_val.len() < MIN_ELEMENTS {
                    continue;
                }
                if to_f16 {
                    tensor.byte_val = quantize_f16(&tensor.float_val);
                    tensor.dtype = crate::dtype::IoDataType::Float16;
                    int8_scale = None;
                } else {
                    let (payload, scale) = quantize_int8(&tensor.float_val);
                    tensor.byte_val = payload;
                    tensor.dtype = crate::dtype::IoDataType::Int8;
                    int8_scale = Some(scale);
                }
                tensor.float_val.clear();
            }

            match int8_scale {
                Some(scale) => {
                    op.ty.dtype = DataType::QInt8;
                    op.attrs
                        .insert("quant_scale".to_string(), AttrValue::F(scale as f64));
                    op.attrs
                        .insert("quant_zero_point".to_string(), AttrValue::I(0));
                }
                None => op.ty.dtype = DataType::Float16,
            }
            quantized += 1;
        }

        log::debug!("quantized {} weight tensors", quantized);
        Ok(())
    }
}
