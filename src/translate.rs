// src/translate.rs
// ============================================================================
// TRANSLATE - Flags del caller → configuración del pipeline
// ============================================================================
//
// El traductor lee los dos bundles de flags y deriva todo lo que consumen
// las etapas siguientes: specs de entrada (con rangos de cuantización),
// salidas en orden verbatim, la quant spec y los toggles del pipeline.
// No toca el grafo; solo lo consulta para rellenar tipos omitidos.
//
// ============================================================================

use std::collections::HashMap;

use crate::dtype::{DataType, IoDataType};
use crate::error::ConvertError;
use crate::flags::{ConvertFlags, FlagWarning, InputFlag, ModelFlags};
use crate::graph::GraphDef;
use crate::import::{self, ImportConfig};
use crate::quant::{self, QuantSpec};

/// Toggles de emisión y lowering, derivados una vez y consumidos tanto por
/// la construcción del pipeline como por el exportador
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub emit_builtin_ops: bool,
    pub emit_select_ops: bool,
    pub emit_custom_ops: bool,
    pub lower_tensor_list_ops: bool,
}

/// Resultado completo de la traducción de flags
#[derive(Debug, Clone)]
pub struct TranslatedFlags {
    pub import_config: ImportConfig,
    pub quant_spec: QuantSpec,
    pub pipeline: PipelineOptions,
    pub warnings: Vec<FlagWarning>,
}

/// Resultado de la resolución de tipo de una entrada.
///
/// Cadena de precedencia explícita para que la regla sea auditable:
/// flag explícito → dtype del placeholder en el grafo → sin resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedType {
    Explicit(DataType),
    InferredFromGraph(DataType),
    Unresolved,
}

impl ResolvedType {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Explicit(dt) | Self::InferredFromGraph(dt) => *dt,
            Self::Unresolved => DataType::Invalid,
        }
    }
}

/// Resuelve el tipo de una entrada declarada
pub fn resolve_input_type(
    flag: &InputFlag,
    placeholders: &HashMap<&str, IoDataType>,
) -> ResolvedType {
    if flag.data_type != IoDataType::Unknown {
        return ResolvedType::Explicit(DataType::from_io(flag.data_type));
    }
    match placeholders.get(flag.name.as_str()) {
        Some(&io) => ResolvedType::InferredFromGraph(DataType::from_io(io)),
        None => ResolvedType::Unresolved,
    }
}

/// Warnings por flags aceptados por el schema legacy pero sin efecto aquí
pub fn warn_unused_flags(
    model_flags: &ModelFlags,
    convert_flags: &ConvertFlags,
) -> Vec<FlagWarning> {
    let mut warnings = Vec::new();

    if let Some(fmt) = &convert_flags.output_format {
        warnings.push(FlagWarning::new(
            "output_format",
            format!("requested container format '{}' has no effect; MIFv1 is always emitted", fmt),
        ));
    }
    if convert_flags.default_ranges_min.is_some() || convert_flags.default_ranges_max.is_some() {
        warnings.push(FlagWarning::new(
            "default_ranges_stats",
            "default quantization ranges are not applied by this pipeline",
        ));
    }
    if convert_flags.drop_control_dependency {
        warnings.push(FlagWarning::new(
            "drop_control_dependency",
            "control dependencies are always handled by the importer",
        ));
    }
    if convert_flags.reorder_across_fake_quant {
        warnings.push(FlagWarning::new(
            "reorder_across_fake_quant",
            "fake-quant reordering has no effect in this pipeline",
        ));
    }
    if model_flags.change_concat_input_ranges {
        warnings.push(FlagWarning::new(
            "change_concat_input_ranges",
            "concat input range rewriting has no effect in this pipeline",
        ));
    }
    if convert_flags.dump_graphviz_include_video {
        warnings.push(FlagWarning::new(
            "dump_graphviz_video",
            "per-pass graph video dumping is not supported",
        ));
    }
    if model_flags.allow_nonexistent_arrays {
        warnings.push(FlagWarning::new(
            "allow_nonexistent_arrays",
            "nonexistent arrays are always an import error",
        ));
    }

    warnings
}

/// Traduce los dos bundles de flags a la configuración del pipeline.
///
/// Un rango de cuantización inderivable desde las declaraciones del caller
/// es `InvalidArgument`; todo lo demás que falla aquí viene del parser de
/// specs del importador y se propaga con su kind original.
pub fn translate_flags(
    model_flags: &ModelFlags,
    convert_flags: &ConvertFlags,
    graph: &GraphDef,
) -> Result<TranslatedFlags, ConvertError> {
    // 1. Tipo de inferencia: el flag de tipo-de-entrada gana cuando es
    //    no-float, porque la cuantización tiene que satisfacer la
    //    restricción más estricta
    let input_type = DataType::from_io(convert_flags.inference_input_type);
    let mut inference_type = DataType::from_io(convert_flags.inference_type);
    if input_type != DataType::Invalid && input_type != DataType::Float32 {
        inference_type = input_type;
    }

    // 2. Lookup placeholder → dtype declarado en el grafo
    let placeholders = graph.placeholder_dtypes();

    // 3. Por cada entrada declarada: tipo resuelto, shape y rango real
    let mut names = Vec::with_capacity(model_flags.input_arrays.len());
    let mut dtypes = Vec::with_capacity(model_flags.input_arrays.len());
    let mut shapes = Vec::with_capacity(model_flags.input_arrays.len());
    let mut mins = Vec::with_capacity(model_flags.input_arrays.len());
    let mut maxs = Vec::with_capacity(model_flags.input_arrays.len());

    for flag in &model_flags.input_arrays {
        let resolved = resolve_input_type(flag, &placeholders);
        names.push(flag.name.clone());
        dtypes.push(resolved.data_type().name().to_string());
        shapes.push(flag.shape.clone());

        let (min, max) = quant::range_from_mean_std(flag.mean_value, flag.std_value);
        mins.push(min);
        maxs.push(max);
    }

    // 4. Delegar en el parser de specs y el builder de la quant spec
    let inputs = import::parse_input_specs(&names, &dtypes, &shapes)?;
    let mut quant_spec = quant::quant_spec_for_inputs(&names, &mins, &maxs, inference_type)
        .map_err(|e| {
            ConvertError::InvalidArgument(format!("failed to build input quant spec: {}", e))
        })?;
    quant_spec.inference_input_type = if input_type != DataType::Invalid {
        input_type
    } else {
        inference_type
    };

    // 5. Post-training: modo global, pisa lo derivado por entrada
    if convert_flags.post_training_quantize {
        quant_spec.weight_quantization = true;
        if convert_flags.quantize_to_float16 {
            quant_spec.inference_type = DataType::Float16;
            quant_spec.inference_input_type = DataType::Float16;
        } else {
            quant_spec.inference_type = DataType::QInt8;
            quant_spec.inference_input_type = DataType::QInt8;
        }
    }

    // 6. Salidas declaradas, orden verbatim
    let output_arrays = import::parse_output_arrays(&model_flags.output_arrays)?;

    // 7. Flags aceptados pero ignorados
    let warnings = warn_unused_flags(model_flags, convert_flags);

    let import_config = ImportConfig {
        inputs,
        output_arrays,
        prune_unused_nodes: true,
        convert_legacy_fed_inputs: true,
        graph_as_function: false,
        upgrade_legacy: true,
    };

    let pipeline = PipelineOptions {
        emit_builtin_ops: !convert_flags.force_select_ops,
        emit_select_ops: convert_flags.enable_select_ops,
        emit_custom_ops: convert_flags.allow_custom_ops,
        lower_tensor_list_ops: convert_flags.lower_tensor_list_ops,
    };

    Ok(TranslatedFlags {
        import_config,
        quant_spec,
        pipeline,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrValue, NodeDef};
    use std::collections::BTreeMap;

    fn graph_with_placeholder(name: &str, dtype: IoDataType) -> GraphDef {
        let mut attr = BTreeMap::new();
        attr.insert("dtype".to_string(), AttrValue::Type(dtype));
        GraphDef {
            node: vec![NodeDef {
                name: name.to_string(),
                op: "Placeholder".to_string(),
                input: vec![],
                attr,
            }],
        }
    }

    fn input(name: &str, data_type: IoDataType, mean: f64, std: f64) -> InputFlag {
        InputFlag {
            name: name.to_string(),
            data_type,
            shape: vec![1, 4],
            mean_value: mean,
            std_value: std,
        }
    }

    fn model_flags(inputs: Vec<InputFlag>) -> ModelFlags {
        ModelFlags {
            input_arrays: inputs,
            output_arrays: vec!["input0".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_input_type_overrides_inference_type() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);
        let convert = ConvertFlags {
            inference_type: IoDataType::Float,
            inference_input_type: IoDataType::QuantizedUint8,
            ..Default::default()
        };

        let t = translate_flags(&flags, &convert, &graph).unwrap();
        // El tipo de entrada no-float pisa al tipo de inferencia general
        assert_eq!(t.quant_spec.inference_type, DataType::QUint8);
        assert_eq!(t.quant_spec.inference_input_type, DataType::QUint8);
    }

    #[test]
    fn test_unset_input_type_falls_back() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);
        let convert = ConvertFlags {
            inference_type: IoDataType::Float,
            ..Default::default()
        };

        let t = translate_flags(&flags, &convert, &graph).unwrap();
        assert_eq!(t.quant_spec.inference_type, DataType::Float32);
        assert_eq!(t.quant_spec.inference_input_type, DataType::Float32);
    }

    #[test]
    fn test_quant_bounds_from_mean_std() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 128.0, 128.0)]);
        let t = translate_flags(&flags, &ConvertFlags::default(), &graph).unwrap();

        let (min, max) = t.quant_spec.input_ranges[0].unwrap();
        assert_eq!(min, -1.0);
        assert!((max - 0.9921875).abs() < 1e-9);
    }

    #[test]
    fn test_placeholder_backfills_type() {
        let graph = graph_with_placeholder("input0", IoDataType::Int32);
        let flags = model_flags(vec![input("input0", IoDataType::Unknown, 0.0, 1.0)]);
        let t = translate_flags(&flags, &ConvertFlags::default(), &graph).unwrap();
        assert_eq!(t.import_config.inputs[0].dtype, DataType::Int32);
    }

    #[test]
    fn test_unresolvable_type_is_invalid() {
        // Sin flag explícito y sin placeholder que matchee
        let graph = graph_with_placeholder("other", IoDataType::Float);
        let mut flags = model_flags(vec![input("input0", IoDataType::Unknown, 0.0, 1.0)]);
        flags.output_arrays = vec!["other".to_string()];
        let t = translate_flags(&flags, &ConvertFlags::default(), &graph).unwrap();
        assert_eq!(t.import_config.inputs[0].dtype, DataType::Invalid);
    }

    #[test]
    fn test_resolved_type_chain() {
        let mut placeholders: HashMap<&str, IoDataType> = HashMap::new();
        placeholders.insert("x", IoDataType::Int64);

        let explicit = input("x", IoDataType::Float, 0.0, 1.0);
        assert_eq!(
            resolve_input_type(&explicit, &placeholders),
            ResolvedType::Explicit(DataType::Float32)
        );

        let inferred = input("x", IoDataType::Unknown, 0.0, 1.0);
        assert_eq!(
            resolve_input_type(&inferred, &placeholders),
            ResolvedType::InferredFromGraph(DataType::Int64)
        );

        let unresolved = input("y", IoDataType::Unknown, 0.0, 1.0);
        assert_eq!(resolve_input_type(&unresolved, &placeholders), ResolvedType::Unresolved);
        assert_eq!(resolve_input_type(&unresolved, &placeholders).data_type(), DataType::Invalid);
    }

    #[test]
    fn test_post_training_quantize_overrides() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);

        let convert = ConvertFlags {
            post_training_quantize: true,
            quantize_to_float16: true,
            ..Default::default()
        };
        let t = translate_flags(&flags, &convert, &graph).unwrap();
        assert!(t.quant_spec.weight_quantization);
        assert_eq!(t.quant_spec.inference_type, DataType::Float16);
        assert_eq!(t.quant_spec.inference_input_type, DataType::Float16);

        let convert = ConvertFlags {
            post_training_quantize: true,
            quantize_to_float16: false,
            // Incluso con tipos explícitos por entrada, el modo global gana
            inference_input_type: IoDataType::QuantizedUint8,
            ..Default::default()
        };
        let t = translate_flags(&flags, &convert, &graph).unwrap();
        assert_eq!(t.quant_spec.inference_type, DataType::QInt8);
        assert_eq!(t.quant_spec.inference_input_type, DataType::QInt8);
    }

    #[test]
    fn test_bad_quant_range_is_invalid_argument() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        // std negativo invierte el rango; con inferencia cuantizada es error
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, -1.0)]);
        let convert = ConvertFlags {
            inference_type: IoDataType::QuantizedUint8,
            ..Default::default()
        };

        let err = translate_flags(&flags, &convert, &graph).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidArgument(_)));
    }

    #[test]
    fn test_warnings_for_ignored_flags() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let mut flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);
        flags.change_concat_input_ranges = true;
        flags.allow_nonexistent_arrays = true;
        let convert = ConvertFlags {
            output_format: Some("legacy_pb".to_string()),
            default_ranges_min: Some(0.0),
            dump_graphviz_include_video: true,
            ..Default::default()
        };

        let t = translate_flags(&flags, &convert, &graph).unwrap();
        let flagged: Vec<&str> = t.warnings.iter().map(|w| w.flag).collect();
        assert_eq!(
            flagged,
            vec![
                "output_format",
                "default_ranges_stats",
                "change_concat_input_ranges",
                "dump_graphviz_video",
                "allow_nonexistent_arrays"
            ]
        );
    }

    #[test]
    fn test_no_warnings_by_default() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);
        let t = translate_flags(&flags, &ConvertFlags::default(), &graph).unwrap();
        assert!(t.warnings.is_empty());
    }

    #[test]
    fn test_pipeline_toggles() {
        let graph = graph_with_placeholder("input0", IoDataType::Float);
        let flags = model_flags(vec![input("input0", IoDataType::Float, 0.0, 1.0)]);
        let convert = ConvertFlags {
            force_select_ops: true,
            enable_select_ops: true,
            allow_custom_ops: true,
            lower_tensor_list_ops: false,
            ..Default::default()
        };

        let t = translate_flags(&flags, &convert, &graph).unwrap();
        assert!(!t.pipeline.emit_builtin_ops);
        assert!(t.pipeline.emit_select_ops);
        assert!(t.pipeline.emit_custom_ops);
        assert!(!t.pipeline.lower_tensor_list_ops);
    }
}
