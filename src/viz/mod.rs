// src/viz/mod.rs
// ============================================================================
// VIZ - Volcado del grafo de ops a DOT
// ============================================================================
//
// Diagnóstico opcional: el orquestador lo invoca dos veces cuando hay un
// directorio de volcado configurado, justo tras importar y justo antes de
// devolver el modelo, con nombres fijos para poder hacer diff del grafo a
// través de todo el pipeline.
//
// ============================================================================

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ConvertError;
use crate::ir::Module;
use crate::passes::{Pass, PassError, PassManager};

/// Nombre del volcado post-importación
pub const DUMP_AT_IMPORT: &str = "toco_AT_IMPORT.dot";
/// Nombre del volcado post-pipeline
pub const DUMP_AFTER_TRANSFORMATIONS: &str = "toco_AFTER_TRANSFORMATIONS.dot";

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Pass de visualización: serializa el grafo de ops del módulo en DOT.
///
/// Falla si el módulo tiene operandos colgantes (el DOT resultante tendría
/// aristas hacia nodos inexistentes).
pub struct ViewOpGraphPass<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> ViewOpGraphPass<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }
}

impl<W: Write> Pass for ViewOpGraphPass<W> {
    fn name(&self) -> &'static str {
        "view-op-graph"
    }

    fn run(&self, module: &mut Module) -> Result<(), PassError> {
        let mut out = self.out.borrow_mut();
        let io_err = |e: std::io::Error| PassError::new("view-op-graph", e.to_string());

        writeln!(out, "digraph \"{}\" {{", dot_escape(&module.name)).map_err(io_err)?;
        writeln!(out, "  rankdir = TB;").map_err(io_err)?;
        writeln!(out, "  node [shape=box];").map_err(io_err)?;

        for op in &module.ops {
            writeln!(
                out,
                "  \"{}\" [label=\"{}\\n{} : {}\"];",
                dot_escape(&op.name),
                dot_escape(&op.op),
                dot_escape(&op.name),
                op.ty.dtype
            )
            .map_err(io_err)?;
        }

        for op in &module.ops {
            for input in &op.inputs {
                if !module.contains(input) {
                    return Err(PassError::new(
                        "view-op-graph",
                        format!("op '{}' references undefined operand '{}'", op.name, input),
                    ));
                }
                writeln!(
                    out,
                    "  \"{}\" -> \"{}\";",
                    dot_escape(input),
                    dot_escape(&op.name)
                )
                .map_err(io_err)?;
            }
        }

        writeln!(out, "}}").map_err(io_err)?;
        out.flush().map_err(io_err)?;
        Ok(())
    }
}

/// Vuelca el grafo de ops del módulo a `filename` en formato DOT.
///
/// No poder abrir el archivo es `InvalidArgument` (nombrando la ruta); un
/// fallo del pass de visualización es `Unknown`. En éxito el archivo se
/// conserva.
pub fn dump_op_graph(module: &mut Module, filename: &Path) -> Result<(), ConvertError> {
    let file = File::create(filename).map_err(|_| {
        ConvertError::InvalidArgument(format!("failed to open file in {}", filename.display()))
    })?;

    let mut pm = PassManager::new();
    pm.add_pass(ViewOpGraphPass::new(BufWriter::new(file)));
    pm.run(module)
        .map_err(|_| ConvertError::Unknown("failed to dump op graph from module".to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;
    use crate::ir::{Operation, TensorType};

    fn test_module() -> Module {
        let mut module = Module::new("main");
        module.inputs = vec!["x".to_string()];
        module.outputs = vec!["y".to_string()];
        module.push_op(
            Operation::new("x", "Placeholder").with_type(TensorType::new(DataType::Float32)),
        );
        module.push_op(
            Operation::new("y", "relu")
                .with_inputs(vec!["x".to_string()])
                .with_type(TensorType::new(DataType::Float32)),
        );
        module
    }

    #[test]
    fn test_dot_output() {
        let mut buf = Vec::new();
        let mut module = test_module();
        ViewOpGraphPass::new(&mut buf).run(&mut module).unwrap();

        let dot = String::from_utf8(buf).unwrap();
        assert!(dot.starts_with("digraph \"main\""));
        assert!(dot.contains("\"x\" -> \"y\";"));
        assert!(dot.contains("relu"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dangling_operand_fails() {
        let mut module = Module::new("main");
        module.push_op(Operation::new("y", "relu").with_inputs(vec!["ghost".to_string()]));

        let mut buf = Vec::new();
        let err = ViewOpGraphPass::new(&mut buf).run(&mut module).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_dump_creates_and_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DUMP_AT_IMPORT);
        let mut module = test_module();

        dump_op_graph(&mut module, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("digraph"));
    }

    #[test]
    fn test_dump_bad_path_is_invalid_argument() {
        let mut module = test_module();
        let err = dump_op_graph(&mut module, Path::new("/nonexistent-dir/x.dot")).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidArgument(_)));
        assert!(err.to_string().contains("/nonexistent-dir/x.dot"));
    }
}
