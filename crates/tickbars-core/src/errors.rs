//! Processing error types

use thiserror::Error;

/// Configuration-time errors for accumulators and dispatchers
///
/// All of these are fatal: a bad spec is rejected at construction and never
/// replaced with a default.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid threshold: {threshold}. Threshold must be a finite number greater than 0")]
    InvalidThreshold { threshold: f64 },

    #[error("Unknown bar metric '{metric}'. Expected one of: tick, volume, dollar")]
    UnknownMetric { metric: String },

    #[error("Invalid bar spec '{spec}'. Expected <metric>:<threshold>, e.g. volume:1000")]
    InvalidSpec { spec: String },

    #[error("Duplicate bar spec: {spec}")]
    DuplicateSpec { spec: String },

    #[error("No bar specs configured")]
    NoBarSpecs,
}
