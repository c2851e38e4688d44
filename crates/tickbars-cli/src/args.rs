//! Command-line arguments and their configuration overrides

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tickbars_config::{CliConfigMerge, Settings};
use tickbars_io::TradeLayout;

#[derive(Parser, Debug)]
#[command(
    name = "tickbars",
    about = "Tick, volume and dollar bars from trade files, plus CUSUM event sampling",
    long_about = "
Activity-clocked bar construction: a bar closes when the tick count, traded
volume or traded dollar value of its bucket reaches a fixed threshold.

Configuration precedence (highest to lowest): command-line arguments,
TICKBARS_<SECTION>__<KEY> environment variables, the configuration file
(--config, or ./tickbars.toml if present), built-in defaults.

Examples:
  tickbars bars --input trades.csv --spec volume:1000 --spec dollar:1e6
  tickbars bars --input day1.csv --input day2.csv --spec tick:500
  tickbars bars --input es.csv --layout date-time --page-size 500000 --prefetch 2
  tickbars cusum --input closes.csv --column close --threshold 0.5
",
    version
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build bars from a trade CSV and write one CSV per spec
    Bars(BarsArgs),
    /// Print the labels of CUSUM events in a CSV series
    Cusum(CusumArgs),
}

/// Trade file column layout
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    /// timestamp,price,volume (epoch ms or µs)
    Epoch,
    /// Date,Time,Price,Volume
    DateTime,
}

impl From<LayoutArg> for TradeLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Epoch => TradeLayout::Epoch,
            LayoutArg::DateTime => TradeLayout::DateTime,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct BarsArgs {
    /// Trade CSV file, repeatable (files are read in order as one trade stream)
    #[arg(long = "input", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Bar spec, repeatable (replaces the configured specs)
    #[arg(long = "spec", value_name = "METRIC:THRESHOLD")]
    pub specs: Vec<String>,

    /// Rows read per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Pages read ahead on a background thread
    #[arg(long)]
    pub prefetch: Option<usize>,

    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Directory for the bar files
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl CliConfigMerge for BarsArgs {
    fn merge_into_config(&self, config: &mut Settings) {
        if !self.inputs.is_empty() {
            config.data.input_paths = self.inputs.clone();
        }
        if !self.specs.is_empty() {
            config.bars.specs = self.specs.clone();
        }
        if let Some(page_size) = self.page_size {
            config.data.page_size = page_size;
        }
        if let Some(prefetch) = self.prefetch {
            config.data.prefetch_pages = prefetch;
        }
        if let Some(layout) = self.layout {
            config.data.layout = layout.into();
        }
        if let Some(output_dir) = &self.output_dir {
            config.export.output_dir = output_dir.clone();
        }
    }
}

#[derive(Args, Debug)]
pub struct CusumArgs {
    /// Series CSV file; the first column is the row label
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Column holding the values
    #[arg(long, value_name = "NAME")]
    pub column: String,

    /// Fixed threshold (defaults to cusum.threshold)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Column holding a per-row threshold
    #[arg(long, value_name = "NAME")]
    pub threshold_column: Option<String>,
}

impl CliConfigMerge for CusumArgs {
    fn merge_into_config(&self, config: &mut Settings) {
        if let Some(threshold) = self.threshold {
            config.cusum.threshold = Some(threshold);
        }
    }
}
