// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use worktime_core::{
    aggregate_sheet, sheet_io, AppConfig, CollectingSink, DiagnosticSink, MonthReport,
    ProjectRegistry, SystemClock, TracingSink,
};

/// Splits each employee's daily hours across their concurrent projects.
#[derive(Parser, Debug)]
#[command(name = "worktime-core", version, about)]
struct Cli {
    /// Timesheet workbook (.xlsx) with one sheet per month named like `3月`,
    /// or a directory of monthly CSV sheets named like `3月.csv`
    timesheet: PathBuf,
    /// Project/membership registry (.xlsx, or .csv)
    registry: PathBuf,
    /// Report unknown employees, gap days and malformed cells
    #[arg(long)]
    strict: bool,
    /// Year of the timesheet, instead of reading it from the workbook name
    #[arg(long)]
    year: Option<i32>,
    /// Directory receiving the TimeResults_<workbook> output
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Also append the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Opening log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Setting tracing subscriber failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("Reading WORKTIME_* configuration")?;
    config.strict |= cli.strict;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }

    init_tracing(config.log_file.as_deref())?;
    info!("**** Starting timesheet redistribution ...");

    if let Err(e) = run(&cli.timesheet, &cli.registry, cli.year, config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(
    timesheet: &Path,
    registry_path: &Path,
    year: Option<i32>,
    config: AppConfig,
) -> Result<()> {
    let sink = TracingSink;

    // Phase 1: registry, fatal on the first bad row.
    let rows = sheet_io::read_registry_file(registry_path, &config)?;
    let registry = ProjectRegistry::from_rows(rows, &SystemClock)
        .with_context(|| format!("Invalid project registry {}", registry_path.display()))?;
    sink.info("Project membership sheet loaded.");

    // Phase 2: sheet structure.
    let workbook = sheet_io::read_workbook(timesheet, year, &config, &sink)?;
    sink.info("Timesheet workbook loaded.");

    // Phase 3: months are independent; the registry is shared read-only.
    let registry = Arc::new(registry);
    let config = Arc::new(config);
    let mut tasks = JoinSet::new();
    for (idx, sheet) in workbook.sheets.into_iter().enumerate() {
        let registry = Arc::clone(&registry);
        let config = Arc::clone(&config);
        tasks.spawn_blocking(move || {
            let collected = CollectingSink::new();
            let report = aggregate_sheet(
                &sheet,
                &registry,
                &collected,
                config.strict,
                config.identity_columns,
            );
            (idx, report, collected)
        });
    }

    let mut finished: Vec<(usize, MonthReport, CollectingSink)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        finished.push(joined.context("Month processing task failed")?);
    }
    finished.sort_by_key(|(idx, _, _)| *idx);

    let mut reports = Vec::with_capacity(finished.len());
    for (_, report, collected) in finished {
        collected.replay(&sink);
        reports.push(report);
    }

    // Phase 4: output.
    sink.info("Writing redistributed timesheet ...");
    let target = sheet_io::write_workbook(
        &config.output_dir,
        &workbook.name,
        workbook.format,
        &reports,
    )?;
    sink.info(&format!(
        "Timesheet processing complete, results written to {}",
        target.display()
    ));
    Ok(())
}
