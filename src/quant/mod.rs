// src/quant/mod.rs
// ============================================================================
// QUANT - Especificación de cuantización y kernels de pesos
// ============================================================================
//
// QuantSpec describe la precisión numérica objetivo de la inferencia y los
// rangos reales por entrada. Los rangos vienen de los flags mean/std del
// caller, mapeando el rango uint8 [0, 255] de vuelta al dominio real:
//
//   min = (0   - mean) / std
//   max = (255 - mean) / std
//
// Los kernels de abajo son los que usa el pass de cuantización de pesos.
//
// ============================================================================

use half::f16;
use rayon::prelude::*;

use crate::dtype::DataType;

pub const EPS: f32 = 1e-7;

/// Límites del rango de cuantización asumido (uint8)
pub const QMIN: f64 = 0.0;
pub const QMAX: f64 = 255.0;

/// Spec de cuantización derivada de los flags
#[derive(Debug, Clone)]
pub struct QuantSpec {
    /// Tipo numérico de la inferencia
    pub inference_type: DataType,
    /// Tipo de las entradas (puede ser más estricto que inference_type)
    pub inference_input_type: DataType,
    /// Cuantizar solo pesos (post-training), no activaciones
    pub weight_quantization: bool,
    /// Rango real (min, max) por entrada, en orden de declaración
    pub input_ranges: Vec<Option<(f64, f64)>>,
}

impl Default for QuantSpec {
    fn default() -> Self {
        Self {
            inference_type: DataType::Float32,
            inference_input_type: DataType::Float32,
            weight_quantization: false,
            input_ranges: vec![],
        }
    }
}

/// Rango real de una entrada a partir de mean/std
pub fn range_from_mean_std(mean: f64, std: f64) -> (f64, f64) {
    ((QMIN - mean) / std, (QMAX - mean) / std)
}

/// Construye la QuantSpec de las entradas del grafo.
///
/// Los tres slices van en paralelo y en orden de declaración. Con un tipo de
/// inferencia cuantizado, cada rango debe ser finito y bien ordenado; si no,
/// los flags del caller no alcanzan para derivar rangos y esto es error (el
/// traductor lo reporta como invalid argument).
pub fn quant_spec_for_inputs(
    names: &[String],
    mins: &[f64],
    maxs: &[f64],
    inference_type: DataType,
) -> Result<QuantSpec, String> {
    if names.len() != mins.len() || names.len() != maxs.len() {
        return Err(format!(
            "range arity mismatch: {} names, {} mins, {} maxs",
            names.len(),
            mins.len(),
            maxs.len()
        ));
    }

    let mut input_ranges = Vec::with_capacity(names.len());
    for i in 0..names.len() {
        let (min, max) = (mins[i], maxs[i]);
        if inference_type.is_quantized() {
            if !min.is_finite() || !max.is_finite() {
                return Err(format!("non-finite quant range for input '{}'", names[i]));
            }
            if min > max {
                return Err(format!(
                    "inverted quant range for input '{}': [{}, {}]",
                    names[i], min, max
                ));
            }
        }
        input_ranges.push(Some((min, max)));
    }

    Ok(QuantSpec {
        inference_type,
        inference_input_type: inference_type,
        weight_quantization: false,
        input_ranges,
    })
}

// ============================================================================
// KERNELS DE PESOS
// ============================================================================

/// f32 → f16 little-endian (sin pérdida relevante para pesos)
pub fn quantize_f16(data: &[f32]) -> Vec<u8> {
    data.iter()
        .flat_map(|&x| f16::from_f32(x).to_le_bytes())
        .collect()
}

pub fn dequantize_f16(data: &[u8], numel: usize) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
        .take(numel)
        .collect()
}

/// f32 → int8 afín simétrico por tensor.
///
/// scale = max_abs / 127, zero_point = 0. Devuelve (payload, scale).
pub fn quantize_int8(data: &[f32]) -> (Vec<u8>, f32) {
    let max_abs = data
        .par_iter()
        .fold(|| 0.0f32, |acc, &x| acc.max(x.abs()))
        .reduce(|| 0.0f32, f32::max);
    let scale = (max_abs / 127.0).max(EPS);

    let payload: Vec<u8> = data
        .par_iter()
        .map(|&x| {
            let q = (x / scale).round().clamp(-127.0, 127.0) as i8;
            q as u8
        })
        .collect();

    (payload, scale)
}

pub fn dequantize_int8(data: &[u8], scale: f32, numel: usize) -> Vec<f32> {
    data.iter()
        .map(|&b| (b as i8) as f32 * scale)
        .take(numel)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_range_from_mean_std() {
        // mean=0, std=1 → el rango uint8 tal cual
        assert_eq!(range_from_mean_std(0.0, 1.0), (0.0, 255.0));

        // mean=128, std=128 → [-1, ~0.992]
        let (min, max) = range_from_mean_std(128.0, 128.0);
        assert_eq!(min, -1.0);
        assert!((max - 0.9921875).abs() < 1e-9);
    }

    #[test]
    fn test_quant_spec_float_inference() {
        let spec = quant_spec_for_inputs(
            &["a".to_string()],
            &[f64::NEG_INFINITY],
            &[f64::INFINITY],
            DataType::Float32,
        )
        .unwrap();
        // Con inferencia float los rangos no se validan
        assert_eq!(spec.input_ranges.len(), 1);
        assert!(!spec.weight_quantization);
    }

    #[test]
    fn test_quant_spec_rejects_bad_ranges() {
        // Rango no finito con tipo cuantizado
        assert!(quant_spec_for_inputs(
            &["a".to_string()],
            &[f64::NAN],
            &[1.0],
            DataType::QUint8,
        )
        .is_err());

        // Rango invertido
        assert!(quant_spec_for_inputs(
            &["a".to_string()],
            &[2.0],
            &[1.0],
            DataType::QInt8,
        )
        .is_err());

        // Aridades distintas
        assert!(quant_spec_for_inputs(&["a".to_string()], &[], &[1.0], DataType::QInt8).is_err());
    }

    #[test]
    fn test_f16_roundtrip() {
        let data: Vec<f32> = vec![0.0, 1.0, -1.5, 0.333, 100.0];
        let q = quantize_f16(&data);
        assert_eq!(q.len(), data.len() * 2);
        let back = dequantize_f16(&q, data.len());
        for (a, b) in data.iter().zip(back.iter()) {
            assert!((a - b).abs() < 0.05, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_int8_roundtrip_tolerance() {
        let mut rng = rand::thread_rng();
        let data: Vec<f32> = (0..4096).map(|_| rng.gen_range(-2.0..2.0)).collect();

        let (q, scale) = quantize_int8(&data);
        assert_eq!(q.len(), data.len());
        let back = dequantize_int8(&q, scale, data.len());

        // Error máximo acotado por medio paso de cuantización
        for (a, b) in data.iter().zip(back.iter()) {
            assert!((a - b).abs() <= scale * 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_int8_all_zeros() {
        let data = vec![0.0f32; 256];
        let (q, scale) = quantize_int8(&data);
        assert!(scale > 0.0);
        assert!(q.iter().all(|&b| b == 0));
    }
}
