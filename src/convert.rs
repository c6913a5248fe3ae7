// src/convert.rs
// ============================================================================
// CONVERT - Orquestador de la conversión completa
// ============================================================================
//
// El orquestador es TONTO:
// - NO interpreta flags (lo hace translate)
// - NO transforma el grafo (lo hacen los passes)
// - Solo secuencia: traducir → importar → pipeline → exportar
//
// Todo-o-nada por invocación: el primer fallo de cualquier etapa aborta y
// se devuelve tal cual, sin salida parcial ni reintentos.
//
// ============================================================================

use crate::error::ConvertError;
use crate::export::{self, ExportOptions};
use crate::flags::{ConvertFlags, FlagWarning, ModelFlags};
use crate::graph::{DebugInfo, GraphDef};
use crate::import;
use crate::passes::{self, PassConfig};
use crate::translate;
use crate::viz;

/// Resultado de una conversión: el modelo serializado más los warnings por
/// flags ignorados (el caller decide cómo exponerlos)
#[derive(Debug)]
pub struct Conversion {
    pub model: Vec<u8>,
    pub warnings: Vec<FlagWarning>,
}

/// Convierte un grafo serializado en un modelo MIFv1.
///
/// Secuencia: traducir flags → importar a módulo IR → volcado opcional →
/// pipeline de passes → exportar → volcado opcional. El módulo vive
/// exclusivamente dentro de esta llamada.
pub fn convert(
    model_flags: &ModelFlags,
    convert_flags: &ConvertFlags,
    debug_info: &DebugInfo,
    graph: &GraphDef,
) -> Result<Conversion, ConvertError> {
    let translated = translate::translate_flags(model_flags, convert_flags, graph)?;

    let mut module = import::import_graph(graph, debug_info, &translated.import_config)?;

    if let Some(dir) = &convert_flags.dump_graphviz_dir {
        viz::dump_op_graph(&mut module, &dir.join(viz::DUMP_AT_IMPORT))?;
    }

    let pass_config = PassConfig {
        quant: translated.quant_spec.clone(),
        emit_builtin_ops: translated.pipeline.emit_builtin_ops,
        lower_tensor_list_ops: translated.pipeline.lower_tensor_list_ops,
    };
    let pm = passes::build_pipeline(&pass_config);
    pm.run(&mut module)?;

    let export_opts = ExportOptions {
        emit_builtin_ops: translated.pipeline.emit_builtin_ops,
        emit_select_ops: translated.pipeline.emit_select_ops,
        emit_custom_ops: translated.pipeline.emit_custom_ops,
    };
    let model = export::export_module(&module, &translated.quant_spec, &export_opts)?;

    if let Some(dir) = &convert_flags.dump_graphviz_dir {
        viz::dump_op_graph(&mut module, &dir.join(viz::DUMP_AFTER_TRANSFORMATIONS))?;
    }

    Ok(Conversion {
        model,
        warnings: translated.warnings,
    })
}
