//! Export and output configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tickbars_io::CsvExportConfig;

/// Export and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving one file per bar spec
    pub output_dir: PathBuf,

    /// File name prefix: `{prefix}_{metric}_{threshold}.csv`
    pub file_prefix: String,

    /// Single-byte field delimiter
    pub delimiter: String,

    /// Write a header row
    pub include_header: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            file_prefix: "bars".to_string(),
            delimiter: ",".to_string(),
            include_header: true,
        }
    }
}

impl ExportConfig {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::InvalidDelimiter {
                delimiter: self.delimiter.clone(),
            }),
        }
    }

    pub fn csv_config(&self) -> Result<CsvExportConfig, ConfigError> {
        Ok(CsvExportConfig {
            delimiter: self.delimiter_byte()?,
            include_header: self.include_header,
        })
    }
}
