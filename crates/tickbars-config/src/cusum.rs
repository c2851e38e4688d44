//! CUSUM filter configuration

use serde::{Deserialize, Serialize};

/// CUSUM filter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CusumConfig {
    /// Fixed threshold used when no per-row threshold column is given
    pub threshold: Option<f64>,
}
