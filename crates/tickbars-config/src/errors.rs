use thiserror::Error;
use tickbars_core::ProcessingError;

/// Configuration load and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid bar spec '{spec}'")]
    Spec {
        spec: String,
        #[source]
        source: ProcessingError,
    },

    #[error(transparent)]
    Specs(#[from] ProcessingError),

    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },

    #[error("delimiter must be a single ASCII character, got '{delimiter}'")]
    InvalidDelimiter { delimiter: String },

    #[error("invalid CUSUM threshold {threshold}: must be a finite number greater than 0")]
    InvalidCusumThreshold { threshold: f64 },
}
