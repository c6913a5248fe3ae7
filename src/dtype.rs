// src/dtype.rs
// ============================================================================
// DTYPE - Tipos de datos wire-level e internos
// ============================================================================

use serde::{Deserialize, Serialize};

/// Tag de tipo a nivel de wire (el que llega en flags y atributos del grafo).
///
/// Conjunto cerrado: cualquier cosa fuera de aquí no deserializa, y el
/// mapeo a tipo interno decide qué hacer con los tags no soportados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoDataType {
    #[default]
    Unknown,
    Float,
    QuantizedUint8,
    Int32,
    Int64,
    String,
    Bool,
    Int8,
    Float16,
}

impl IoDataType {
    /// Parsea un tag desde CLI (ej: "float", "int8", "quantized_uint8")
    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "float" | "float32" => Some(Self::Float),
            "quantized_uint8" | "uint8" => Some(Self::QuantizedUint8),
            "int8" => Some(Self::Int8),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            "float16" => Some(Self::Float16),
            _ => None,
        }
    }
}

/// Tipo interno del compilador.
///
/// `Invalid` es un centinela explícito: el mapeo desde wire nunca falla,
/// los consumidores deben comprobarlo aguas abajo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float32,
    Float16,
    QUint8,
    QInt8,
    Int32,
    Int64,
    Str,
    Bool,
    Invalid,
}

impl DataType {
    /// Convierte un tag wire-level al tipo interno.
    ///
    /// Solo contiene el mapeo para las constantes expuestas por la API de
    /// conversión; todo lo demás cae en `Invalid` en vez de fallar.
    pub fn from_io(dtype: IoDataType) -> Self {
        match dtype {
            IoDataType::Float => Self::Float32,
            IoDataType::QuantizedUint8 => Self::QUint8,
            IoDataType::Int8 => Self::QInt8,
            IoDataType::Int32 => Self::Int32,
            IoDataType::Int64 => Self::Int64,
            IoDataType::String => Self::Str,
            IoDataType::Bool => Self::Bool,
            _ => Self::Invalid,
        }
    }

    /// Nombre canónico (el que viaja en specs y en el contenedor exportado)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float16 => "float16",
            Self::QUint8 => "quint8",
            Self::QInt8 => "qint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Invalid => "invalid",
        }
    }

    /// Inverso de `name()` (lo usa el parser de input specs)
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "float32" => Some(Self::Float32),
            "float16" => Some(Self::Float16),
            "quint8" => Some(Self::QUint8),
            "qint8" => Some(Self::QInt8),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "string" => Some(Self::Str),
            "bool" => Some(Self::Bool),
            "invalid" => Some(Self::Invalid),
            _ => None,
        }
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, Self::QUint8 | Self::QInt8)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_tags() {
        assert_eq!(DataType::from_io(IoDataType::Float), DataType::Float32);
        assert_eq!(DataType::from_io(IoDataType::QuantizedUint8), DataType::QUint8);
        assert_eq!(DataType::from_io(IoDataType::Int8), DataType::QInt8);
        assert_eq!(DataType::from_io(IoDataType::Int32), DataType::Int32);
        assert_eq!(DataType::from_io(IoDataType::Int64), DataType::Int64);
        assert_eq!(DataType::from_io(IoDataType::String), DataType::Str);
        assert_eq!(DataType::from_io(IoDataType::Bool), DataType::Bool);
    }

    #[test]
    fn test_unrecognized_tags_map_to_invalid() {
        // Fuera del conjunto documentado: centinela, nunca panic
        assert_eq!(DataType::from_io(IoDataType::Unknown), DataType::Invalid);
        assert_eq!(DataType::from_io(IoDataType::Float16), DataType::Invalid);
    }

    #[test]
    fn test_name_roundtrip() {
        for dt in [
            DataType::Float32,
            DataType::Float16,
            DataType::QUint8,
            DataType::QInt8,
            DataType::Int32,
            DataType::Int64,
            DataType::Str,
            DataType::Bool,
            DataType::Invalid,
        ] {
            assert_eq!(DataType::from_name(dt.name()), Some(dt));
        }
        assert_eq!(DataType::from_name("complex64"), None);
    }
}
