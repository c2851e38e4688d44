//! Bar specification configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use tickbars_core::{BarSpec, validate_specs};

/// Which bars to build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsConfig {
    /// Specs in `metric:threshold` form, one accumulator each
    pub specs: Vec<String>,
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            specs: vec![
                "tick:100".to_string(),
                "volume:1000".to_string(),
                "dollar:10000".to_string(),
            ],
        }
    }
}

impl BarsConfig {
    /// Parse and validate the configured specs, keeping their order
    pub fn parse_specs(&self) -> Result<Vec<BarSpec>, ConfigError> {
        let specs = self
            .specs
            .iter()
            .map(|raw| {
                raw.trim().parse::<BarSpec>().map_err(|source| ConfigError::Spec {
                    spec: raw.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        validate_specs(&specs)?;
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbars_core::ProcessingError;

    #[test]
    fn test_default_specs() {
        let specs = BarsConfig::default().parse_specs().unwrap();
        assert_eq!(
            specs,
            vec![
                BarSpec::tick(100).unwrap(),
                BarSpec::volume(1000.0).unwrap(),
                BarSpec::dollar(10000.0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_invalid_specs() {
        let config = BarsConfig {
            specs: vec!["volume:-5".to_string()],
        };
        assert!(matches!(
            config.parse_specs(),
            Err(ConfigError::Spec { .. })
        ));

        let config = BarsConfig {
            specs: vec!["tick:5".to_string(), " tick:5 ".to_string()],
        };
        assert!(matches!(
            config.parse_specs(),
            Err(ConfigError::Specs(ProcessingError::DuplicateSpec { .. }))
        ));

        let config = BarsConfig { specs: Vec::new() };
        assert!(matches!(
            config.parse_specs(),
            Err(ConfigError::Specs(ProcessingError::NoBarSpecs))
        ));
    }
}
