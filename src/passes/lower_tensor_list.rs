// src/passes/lower_tensor_list.rs
// ============================================================================
// LOWER TENSOR LIST - Baja ops TensorList* a primitivas
// ============================================================================

use super::{Pass, PassError};
use crate::ir::Module;

/// Lowering de cada op de lista soportada a su primitiva equivalente
const LOWERINGS: &[(&str, &str)] = &[
    ("TensorListFromTensor", "reshape"),
    ("TensorListStack", "pack"),
    ("TensorListGetItem", "gather"),
    ("TensorListSetItem", "dynamic_update_slice"),
    ("TensorListReserve", "fill"),
    ("TensorListLength", "shape"),
];

/// Reescribe las ops TensorList* en primitivas del op set builtin.
///
/// Una op TensorList sin lowering conocido es fallo del pass: dejarla pasar
/// produciría un modelo inejecutable en el runtime móvil.
pub struct LowerTensorListPass;

impl Pass for LowerTensorListPass {
    fn name(&self) -> &'static str {
        "lower-tensor-list"
    }

    fn run(&self, module: &mut Module) -> Result<(), PassError> {
        for op in &mut module.ops {
            if !op.op.starts_with("TensorList") {
                continue;
            }
            match LOWERINGS.iter().find(|(from, _)| *from == op.op) {
                Some((_, lowered)) => op.op = lowered.to_string(),
                None => {
                    return Err(PassError::new(
                        self.name(),
                        format!("no lowering for op '{}' ({})", op.op, op.name),
                    ));
                }
            }
        }
        Ok(())
    }
}
