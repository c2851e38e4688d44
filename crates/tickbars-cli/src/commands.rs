//! Subcommand implementations

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tickbars_batch::BatchEngine;
use tickbars_config::Settings;
use tickbars_core::CusumFilter;
use tickbars_io::{BarCsvWriter, CsvExportResult, read_series};

/// What `tickbars bars` produced
#[derive(Debug, Clone)]
pub struct BarsSummary {
    pub trades_processed: u64,
    pub rows_rejected: usize,
    /// One export per spec, in spec order
    pub exports: Vec<CsvExportResult>,
}

/// Batch run over the configured input, then one CSV per spec
pub fn run_bars(settings: &Settings) -> Result<BarsSummary> {
    let specs = settings.validate().context("invalid configuration")?;
    let inputs = &settings.data.input_paths;
    if inputs.is_empty() {
        bail!("no input file: pass --input or set data.input_paths");
    }

    let engine = BatchEngine::new(specs, settings.data.batch_config())?;
    let result = engine
        .process_csv_files(inputs, settings.data.layout)
        .with_context(|| {
            let names: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
            format!("failed to process {}", names.join(", "))
        })?;

    if !result.rejected.is_empty() {
        tracing::warn!(
            rejected = result.rejected.len(),
            first_line = result.rejected[0].line,
            "rows rejected from input"
        );
    }

    let output_dir = &settings.export.output_dir;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let writer = BarCsvWriter::with_config(settings.export.csv_config()?);
    let mut exports = Vec::with_capacity(engine.specs().len());
    for (spec, bars) in result.bars.iter() {
        let path = output_dir.join(BarCsvWriter::file_name(&settings.export.file_prefix, spec));
        exports.push(writer.export(spec.metric(), bars, &path)?);
    }

    tracing::info!(
        trades = result.trades_processed,
        rejected = result.rejected.len(),
        bars = result.bars.total_bars(),
        incomplete = result.incomplete.len(),
        files = exports.len(),
        "bars written"
    );

    Ok(BarsSummary {
        trades_processed: result.trades_processed,
        rows_rejected: result.rejected.len(),
        exports,
    })
}

/// Labels of the CUSUM events in a CSV series
///
/// A per-row threshold column, when given, is used instead of the fixed
/// threshold.
pub fn run_cusum(
    settings: &Settings,
    input: &Path,
    column: &str,
    threshold_column: Option<&str>,
) -> Result<Vec<String>> {
    settings.validate_cusum().context("invalid configuration")?;

    let series = read_series(input, column, threshold_column)
        .with_context(|| format!("failed to read {}", input.display()))?;

    if series.thresholds.is_none() && settings.cusum.threshold.is_none() {
        bail!("no CUSUM threshold: pass --threshold or --threshold-column");
    }
    let threshold = series.threshold(settings.cusum.threshold.unwrap_or_default());

    let events = CusumFilter::scan(&series.values, &threshold)?;
    tracing::info!(
        values = series.values.len(),
        rejected = series.rejected.len(),
        events = events.len(),
        "CUSUM scan complete"
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tickbars_core::test_utils;

    fn settings_for(input: PathBuf, output_dir: PathBuf) -> Settings {
        let mut settings = Settings::default();
        settings.data.input_paths = vec![input];
        settings.data.page_size = 64;
        settings.export.output_dir = output_dir;
        settings.bars.specs = vec!["tick:10".to_string(), "volume:30".to_string()];
        settings
    }

    #[test]
    fn test_bars_writes_one_file_per_spec() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("trades.csv");
        let mut file = fs::File::create(&input).unwrap();
        writeln!(file, "timestamp,price,volume").unwrap();
        for t in test_utils::sawtooth_trades(200, 50.0) {
            writeln!(file, "{},{},{}", t.timestamp, t.price, t.volume).unwrap();
        }
        writeln!(file, "oops,1,1").unwrap();
        drop(file);

        let settings = settings_for(input, dir.path().join("out"));
        let summary = run_bars(&settings).unwrap();

        assert_eq!(summary.trades_processed, 200);
        assert_eq!(summary.rows_rejected, 1);
        assert_eq!(summary.exports.len(), 2);
        assert_eq!(summary.exports[0].records_written, 20);
        assert!(summary.exports[0].file_path.ends_with("bars_tick_10.csv"));
        assert!(summary.exports[1].file_path.ends_with("bars_volume_30.csv"));

        let text = fs::read_to_string(&summary.exports[0].file_path).unwrap();
        assert!(text.starts_with("open_time,close_time,cum_volume,"));
        assert_eq!(text.lines().count(), 21);
    }

    #[test]
    fn test_bars_reads_input_files_as_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let trades = test_utils::sawtooth_trades(200, 50.0);
        let write = |name: &str, trades: &[tickbars_core::Trade]| {
            let path = dir.path().join(name);
            let mut file = fs::File::create(&path).unwrap();
            writeln!(file, "timestamp,price,volume").unwrap();
            for t in trades {
                writeln!(file, "{},{},{}", t.timestamp, t.price, t.volume).unwrap();
            }
            path
        };
        let whole = write("whole.csv", &trades);
        let first = write("first.csv", &trades[..95]);
        let second = write("second.csv", &trades[95..]);

        let single = run_bars(&settings_for(whole, dir.path().join("single"))).unwrap();
        let mut settings = settings_for(first, dir.path().join("split"));
        settings.data.input_paths.push(second);
        let split = run_bars(&settings).unwrap();

        assert_eq!(split.trades_processed, 200);
        for (a, b) in single.exports.iter().zip(&split.exports) {
            assert_eq!(a.records_written, b.records_written);
            assert_eq!(
                fs::read_to_string(&a.file_path).unwrap(),
                fs::read_to_string(&b.file_path).unwrap()
            );
        }
    }

    #[test]
    fn test_bars_requires_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_for(PathBuf::new(), dir.path().to_path_buf());
        settings.data.input_paths.clear();
        assert!(run_bars(&settings).is_err());
    }

    #[test]
    fn test_cusum_fixed_and_per_row_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("series.csv");
        fs::write(
            &input,
            "idx,value,h\n0,0,2\n1,1,2\n2,2,2\n3,0,2\n4,-3,2\n5,-3,2\n6,5,2\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.cusum.threshold = Some(2.0);
        let events = run_cusum(&settings, &input, "value", None).unwrap();
        assert_eq!(events, vec!["4", "6"]);

        settings.cusum.threshold = None;
        let events = run_cusum(&settings, &input, "value", Some("h")).unwrap();
        assert_eq!(events, vec!["4", "6"]);

        assert!(run_cusum(&settings, &input, "value", None).is_err());

        // Bar settings play no part in a scan
        settings.cusum.threshold = Some(2.0);
        settings.bars.specs = vec!["volume:0".to_string()];
        assert_eq!(run_cusum(&settings, &input, "value", None).unwrap(), vec!["4", "6"]);
    }
}
