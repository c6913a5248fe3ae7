// src/lib.rs
// ============================================================================
// MIF-CONVERT - Conversor de grafos de computación a MIFv1
// ============================================================================

#![recursion_limit = "256"]

pub mod convert;
pub mod dtype;
pub mod error;
pub mod export;
pub mod flags;
pub mod graph;
pub mod import;
pub mod ir;
pub mod passes;
pub mod quant;
pub mod translate;
pub mod viz;

// Re-exports principales
pub use convert::{convert, Conversion};
pub use dtype::{DataType, IoDataType};
pub use error::ConvertError;
pub use flags::{ConvertFlags, FlagWarning, InputFlag, ModelFlags};
pub use graph::{DebugInfo, GraphDef};
pub use quant::QuantSpec;
pub use translate::{translate_flags, TranslatedFlags};
