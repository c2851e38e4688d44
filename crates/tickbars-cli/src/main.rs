use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tickbars_cli::{Cli, Command, init_tracing, run_bars, run_cusum};
use tickbars_config::Settings;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Settings::load().context("failed to load configuration")?,
    };
    let settings = match &cli.command {
        Command::Bars(args) => settings.merge_cli_args(args),
        Command::Cusum(args) => settings.merge_cli_args(args),
    };
    init_tracing(&settings.app);

    match &cli.command {
        Command::Bars(_) => {
            let summary = run_bars(&settings)?;
            for export in &summary.exports {
                println!(
                    "{}\t{}",
                    export.file_path.display(),
                    export.records_written
                );
            }
        }
        Command::Cusum(args) => {
            let events = run_cusum(
                &settings,
                &args.input,
                &args.column,
                args.threshold_column.as_deref(),
            )?;
            let mut out = std::io::stdout().lock();
            for label in events {
                writeln!(out, "{label}")?;
            }
        }
    }

    Ok(())
}
