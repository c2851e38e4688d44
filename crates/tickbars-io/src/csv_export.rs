//! Delimited export of bar sequences
//!
//! Column order comes from [`metric_columns`]; an empty sequence produces a
//! header-only file.

use crate::columns::{metric_columns, metric_header};
use crate::errors::ExportError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tickbars_core::{Bar, BarMetric, BarSpec};

/// CSV export settings
#[derive(Debug, Clone)]
pub struct CsvExportConfig {
    /// Field delimiter (default `,`)
    pub delimiter: u8,

    /// Write the column header row
    pub include_header: bool,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_header: true,
        }
    }
}

/// CSV export result
#[derive(Debug, Clone)]
pub struct CsvExportResult {
    pub records_written: usize,
    pub file_path: PathBuf,
}

/// Writes bars of one metric as delimited text
#[derive(Debug, Default)]
pub struct BarCsvWriter {
    config: CsvExportConfig,
}

impl BarCsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CsvExportConfig) -> Self {
        Self { config }
    }

    /// File name used for a spec's export, e.g. `bars_volume_1000.csv`
    pub fn file_name(prefix: &str, spec: &BarSpec) -> String {
        format!("{prefix}_{}_{}.csv", spec.metric(), spec.threshold())
    }

    /// Export bars to a file, truncating any existing content
    pub fn export<P: AsRef<Path>>(
        &self,
        metric: BarMetric,
        bars: &[Bar],
        path: P,
    ) -> Result<CsvExportResult, ExportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records_written = self.write_to(metric, bars, file, path)?;

        tracing::info!(
            path = %path.display(),
            %metric,
            records = records_written,
            "bars exported"
        );

        Ok(CsvExportResult {
            records_written,
            file_path: path.to_path_buf(),
        })
    }

    /// Write bars to any writer; `label` only names the target in errors
    pub fn write_to<W: Write>(
        &self,
        metric: BarMetric,
        bars: &[Bar],
        writer: W,
        label: &Path,
    ) -> Result<usize, ExportError> {
        let csv_err = |source: csv::Error| ExportError::Csv {
            path: label.to_path_buf(),
            source,
        };

        let mut out = csv::WriterBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(false)
            .from_writer(writer);

        if self.config.include_header {
            out.write_record(metric_header(metric)).map_err(csv_err)?;
        }

        let columns = metric_columns(metric);
        for bar in bars {
            out.write_record(columns.iter().map(|c| c.value(bar).to_string()))
                .map_err(csv_err)?;
        }

        out.flush().map_err(|source| ExportError::Io {
            path: label.to_path_buf(),
            source,
        })?;

        Ok(bars.len())
    }
}
