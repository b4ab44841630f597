//! Error types for the strike engine

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the pricing, calendar and solver layers
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input outside the domain of the closed-form formulas
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
