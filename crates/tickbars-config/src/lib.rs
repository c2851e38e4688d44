//! Configuration management for tickbars
//!
//! Centralized configuration handling with support for:
//! - Default values
//! - Configuration files (TOML)
//! - Environment variables (`TICKBARS_<SECTION>__<KEY>`, e.g.
//!   `TICKBARS_DATA__PAGE_SIZE=5000`, `TICKBARS_BARS__SPECS=tick:50,volume:10`,
//!   `TICKBARS_DATA__INPUT_PATHS=day1.csv,day2.csv`)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

mod app;
mod bars;
mod cusum;
mod data;
mod errors;
mod export;
mod live;

// Re-export main types
pub use app::{AppConfig, LogLevel};
pub use bars::BarsConfig;
pub use cusum::CusumConfig;
pub use data::DataConfig;
pub use errors::ConfigError;
pub use export::ExportConfig;
pub use live::LiveConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tickbars_core::BarSpec;

/// Name of the optional configuration file in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tickbars";

const ENV_PREFIX: &str = "TICKBARS";

/// Root configuration structure containing all configuration categories
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application-wide settings
    pub app: AppConfig,

    /// Bar specs to build
    pub bars: BarsConfig,

    /// Trade input and paging
    pub data: DataConfig,

    /// Export and output configuration
    pub export: ExportConfig,

    /// Live engine channels and overflow behavior
    pub live: LiveConfig,

    /// CUSUM filter defaults
    pub cusum: CusumConfig,
}

impl Settings {
    /// Load configuration from multiple sources with proper precedence
    ///
    /// Reads `tickbars.toml` from the working directory if it exists.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layered(None, None)
    }

    /// Load configuration from a specific file path (required), then the environment
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load_layered(Some(path), None)
    }

    fn load_layered(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE)
                .format(config::FileFormat::Toml)
                .required(false),
        };

        let builder = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file)
            // Add environment variables with TICKBARS_ prefix
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("bars.specs")
                    .with_list_parse_key("data.input_paths")
                    .source(env),
            );

        // Build and deserialize
        let settings: Settings = builder.build()?.try_deserialize()?;
        tracing::debug!(
            file = ?path,
            specs = settings.bars.specs.len(),
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Merge command-line arguments into the loaded configuration
    pub fn merge_cli_args(mut self, cli_args: &dyn CliConfigMerge) -> Self {
        cli_args.merge_into_config(&mut self);
        self
    }

    /// Check every section and return the parsed bar specs
    ///
    /// # Errors
    ///
    /// The first invalid value found: a malformed or duplicate spec, a zero
    /// page size or channel capacity, a bad delimiter or CUSUM threshold.
    pub fn validate(&self) -> Result<Vec<BarSpec>, ConfigError> {
        let specs = self.bars.parse_specs()?;

        let positive = [
            ("data.page_size", self.data.page_size),
            ("live.bar_channel_capacity", self.live.bar_channel_capacity),
            ("live.trade_channel_capacity", self.live.trade_channel_capacity),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { field: *field });
        }

        self.validate_cusum()?;
        Ok(specs)
    }

    /// Check only what a CUSUM scan reads: the export delimiter and the
    /// threshold. Bar specs and paging are left alone.
    pub fn validate_cusum(&self) -> Result<(), ConfigError> {
        self.export.delimiter_byte()?;

        if let Some(threshold) = self.cusum.threshold
            && (!threshold.is_finite() || threshold <= 0.0)
        {
            return Err(ConfigError::InvalidCusumThreshold { threshold });
        }
        Ok(())
    }
}

/// Trait for merging CLI arguments into configuration
pub trait CliConfigMerge {
    fn merge_into_config(&self, config: &mut Settings);
}
