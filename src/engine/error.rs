// src/engine/error.rs

use thiserror::Error;

use crate::engine::signal::Side;

pub type Result<T> = std::result::Result<T, BacktestError>;

/// Everything the engine can refuse to do.
///
/// Invalid arguments and length mismatches are caller errors; the
/// `Position*` variants mean the position protocol was violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid price {price} at bar {bar}")]
    InvalidPrice { bar: usize, price: f64 },

    #[error("unknown signal tag '{0}'")]
    UnknownSignal(String),

    #[error("invalid config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    #[error("prices length {prices} != signals length {signals}")]
    LengthMismatch { prices: usize, signals: usize },

    #[error("{0} position not active")]
    PositionNotActive(Side),

    #[error("{0} position already active")]
    PositionAlreadyActive(Side),
}

impl BacktestError {
    /// True for protocol violations (as opposed to bad inputs).
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            BacktestError::PositionNotActive(_) | BacktestError::PositionAlreadyActive(_)
        )
    }
}
