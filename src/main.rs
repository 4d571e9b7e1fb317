//! shuttersort CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use shuttersort::runner::FileStatus;
use shuttersort::{Cli, Config, Runner};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    let _guard = setup_logging(&cli);

    let config = match &cli.config {
        Some(path) => {
            let file_config = Config::load_from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            cli.merge_with_config(file_config)
        }
        None => cli.to_config(),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        inputs = config.input_dirs.len(),
        output = %config.output_dir.display(),
        dry_run = config.dry_run,
        "shuttersort starting"
    );

    let runner = Runner::new(config)?;
    let reports = runner.run()?;
    let stats = runner.stats();

    println!("{}", stats.summary());
    for report in reports.iter().filter(|r| r.status == FileStatus::Failed) {
        eprintln!(
            "failed: {} ({})",
            report.source.display(),
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    if reports.iter().any(|r| r.status == FileStatus::Failed) {
        std::process::exit(1);
    }
    Ok(())
}

/// Install the tracing subscriber: env-filtered console output, optional
/// JSON format, optional non-blocking log file.
fn setup_logging(cli: &Cli) -> Option<WorkerGuard> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![filter.boxed()];

    if cli.json_log {
        layers.push(fmt::layer().json().boxed());
    } else {
        layers.push(fmt::layer().boxed());
    }

    let mut guard = None;
    if let Some(path) = &cli.log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .unwrap_or(OsStr::new("shuttersort.log"));
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
    }

    tracing_subscriber::registry().with(layers).init();
    guard
}
