// src/passes/legalize.rs
// ============================================================================
// LEGALIZE - Mapeo de ops genéricas al op set builtin móvil
// ============================================================================

use super::{Pass, PassError};
use crate::ir::Module;

/// Tabla de legalización: op genérica del grafo → op builtin
const LEGALIZE_TABLE: &[(&str, &str)] = &[
    ("Conv2D", "conv_2d"),
    ("DepthwiseConv2dNative", "depthwise_conv_2d"),
    ("MatMul", "fully_connected"),
    ("BatchMatMul", "batch_matmul"),
    ("Add", "add"),
    ("BiasAdd", "add"),
    ("Sub", "sub"),
    ("Mul", "mul"),
    ("Div", "div"),
    ("Relu", "relu"),
    ("Relu6", "relu6"),
    ("Sigmoid", "logistic"),
    ("Tanh", "tanh"),
    ("Softmax", "softmax"),
    ("Reshape", "reshape"),
    ("Squeeze", "squeeze"),
    ("Transpose", "transpose"),
    ("Concat", "concatenation"),
    ("Pad", "pad"),
    ("Mean", "mean"),
    ("MaxPool", "max_pool_2d"),
    ("AvgPool", "average_pool_2d"),
    ("StridedSlice", "strided_slice"),
    ("Select", "select"),
    ("Fill", "fill"),
    ("Pack", "pack"),
    ("Gather", "gather"),
    ("Shape", "shape"),
];

/// Op set builtin del formato móvil (los targets de la tabla más los
/// pseudo-ops estructurales)
const BUILTIN_OPS: &[&str] = &[
    "conv_2d",
    "depthwise_conv_2d",
    "fully_connected",
    "batch_matmul",
    "add",
    "sub",
    "mul",
    "div",
    "relu",
    "relu6",
    "logistic",
    "tanh",
    "softmax",
    "reshape",
    "squeeze",
    "transpose",
    "concatenation",
    "pad",
    "mean",
    "max_pool_2d",
    "average_pool_2d",
    "strided_slice",
    "select",
    "fill",
    "pack",
    "gather",
    "shape",
    "dynamic_update_slice",
];

/// Nombre builtin para una op genérica, si existe en la tabla
pub fn builtin_name(op: &str) -> Option<&'static str> {
    LEGALIZE_TABLE
        .iter()
        .find(|(from, _)| *from == op)
        .map(|(_, to)| *to)
}

/// ¿La op pertenece al op set builtin del formato de salida?
///
/// Placeholder y Const son pseudo-ops estructurales, siempre emitibles.
pub fn is_builtin(op: &str) -> bool {
    op == "Placeholder" || op == "Const" || BUILTIN_OPS.contains(&op)
}

/// Legaliza in place las ops con entrada en la tabla; el resto queda intacto
/// para que el exportador las clasifique (select/custom).
pub struct LegalizePass;

impl Pass for LegalizePass {
    fn name(&self) -> &'static str {
        "legalize"
    }

    fn run(&self, module: &mut Module) -> Result<(), PassError> {
        for op in &mut module.ops {
            if let Some(builtin) = builtin_name(&op.op) {
                op.op = builtin.to_string();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Operation;

    #[test]
    fn test_legalize_known_ops() {
        let mut module = Module::new("main");
        module.push_op(Operation::new("w", "Const"));
        module.push_op(Operation::new("conv", "Conv2D"));
        module.push_op(Operation::new("act", "Relu6"));
        module.push_op(Operation::new("weird", "FFT"));

        LegalizePass.run(&mut module).unwrap();

        assert_eq!(module.get("conv").unwrap().op, "conv_2d");
        assert_eq!(module.get("act").unwrap().op, "relu6");
        // Const no se toca, FFT queda para el exportador
        assert_eq!(module.get("w").unwrap().op, "Const");
        assert_eq!(module.get("weird").unwrap().op, "FFT");
    }

    #[test]
    fn test_builtin_set_covers_table_targets() {
        for (_, target) in LEGALIZE_TABLE {
            assert!(is_builtin(target), "'{}' missing from builtin set", target);
        }
        assert!(is_builtin("Placeholder"));
        assert!(is_builtin("Const"));
        assert!(!is_builtin("FFT"));
    }
}
