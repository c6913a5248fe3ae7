// src/error.rs
// ============================================================================
// ERROR - Tipos de error de la conversión
// ============================================================================
//
// Dos kinds propios (InvalidArgument, Unknown) más el pass-through de cada
// etapa: los errores del importador, del pass manager y del exportador se
// propagan con su kind y mensaje originales, sin envolver. Fail-fast: el
// primer fallo aborta la conversión entera.
//
// ============================================================================

use thiserror::Error;

use crate::export::ExportError;
use crate::import::ImportError;
use crate::passes::PassError;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown: {0}")]
    Unknown(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Pass(#[from] PassError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ConvertError {
    /// Nombre del kind, para logging y asserts de tests
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unknown(_) => "unknown",
            Self::Import(_) => "import",
            Self::Pass(_) => "pass",
            Self::Export(_) => "export",
        }
    }
}
