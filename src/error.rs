//! Error types for Tradeflow
//!
//! The data path (queue, window, pipeline) never fails: a full queue is
//! reported through a return value and degenerate numeric inputs are
//! defined as zero. Errors only surface where outside input is parsed,
//! i.e. configuration and wire tags.

use thiserror::Error;

/// Result type alias for Tradeflow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Main error type for Tradeflow operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tag does not name a trader action
    #[error("Unknown trader action tag: {0}")]
    UnknownAction(u8),
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Queue capacity of zero
    #[error("Invalid queue capacity: {0}")]
    InvalidCapacity(usize),

    /// Batch size of zero
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// Window bounds are empty or inverted
    #[error("Invalid window bounds: min {min} > max {max} or min is zero")]
    InvalidWindowBounds { min: usize, max: usize },

    /// Window size outside its bounds
    #[error("Window size {size} outside [{min}, {max}]")]
    WindowOutOfBounds { size: usize, min: usize, max: usize },

    /// A ratio or threshold outside its legal range
    #[error("Invalid value for {name}: {value}")]
    InvalidRatio { name: &'static str, value: f64 },

    /// Malformed configuration document
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration file could not be read or written
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}
