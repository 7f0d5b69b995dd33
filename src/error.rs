use thiserror::Error;

/// Main error type for the rebalancing engine
#[derive(Error, Debug)]
pub enum RebalanceError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Caller input errors (rejected at the advisor boundary, never clamped)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Risk tolerance must be within [0, 1], got {0}")]
    RiskToleranceOutOfRange(f64),

    // Model persistence errors
    #[error("Malformed model file: {0}")]
    ModelFormat(String),

    #[error("Incompatible model architecture: expected {expected}, found {found}")]
    IncompatibleModel { expected: String, found: String },

    #[error("No trainable model available: {0}")]
    ModelUnavailable(String),

    // Training errors
    #[error("Training error: {0}")]
    Training(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for RebalanceError
pub type Result<T> = std::result::Result<T, RebalanceError>;

impl RebalanceError {
    /// Shorthand for a dimension mismatch on a named input
    pub fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    /// Whether the error was caused by caller-controlled input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::DimensionMismatch { .. }
                | Self::RiskToleranceOutOfRange(_)
        )
    }
}
