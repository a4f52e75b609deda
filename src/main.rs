use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use cf_scraper::app::ports::{NullProgress, Progress};
use cf_scraper::common::constants::METRICS_FILE;
use cf_scraper::config::{Config, DEFAULT_CONFIG_PATH};
use cf_scraper::infra::ReqwestFetcher;
use cf_scraper::observability::{init_logging, metrics, ConsoleProgressMeter, Verbosity};
use cf_scraper::pipeline::storage::CacheDirective;
use cf_scraper::pipeline::{Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "cf_scraper")]
#[command(about = "Virginia campaign finance scraper")]
#[command(version)]
struct Cli {
    /// Rebuild the committee roster even if the cached copy is fresh
    #[arg(long, conflicts_with = "from_cache")]
    reload: bool,

    /// Use the cached committee roster regardless of its age
    #[arg(long)]
    from_cache: bool,

    /// Log every committee and report as it is processed
    #[arg(short, long)]
    verbose: bool,

    /// Show a progress bar while the roster is built (quiets logging)
    #[arg(short, long)]
    progress_meter: bool,

    /// Also write each transaction to its own JSON file
    #[arg(long)]
    atomize: bool,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output directory (overrides the config file and CF_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.progress_meter);
    let _log_guard = init_logging(verbosity, &PathBuf::from("logs"));

    match run(&cli) {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if cli.atomize {
        config.output.atomize = true;
    }

    if let Err(e) = metrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let fetcher = ReqwestFetcher::new(&config.http)?;
    let directive = CacheDirective::from_flags(cli.reload, cli.from_cache);
    let mut progress: Box<dyn Progress> = if cli.progress_meter {
        Box::new(ConsoleProgressMeter::stderr())
    } else {
        Box::new(NullProgress)
    };

    info!(output = %config.output.dir.display(), "Starting campaign finance run");
    let summary = Pipeline::new(&fetcher, &config).run(directive, progress.as_mut())?;

    let metrics_path = config.output.dir.join(METRICS_FILE);
    if let Err(e) = metrics::write_textfile(&metrics_path) {
        warn!(path = %metrics_path.display(), "Could not write metrics: {}", e);
    }
    Ok(summary)
}

fn report(summary: &RunSummary) {
    info!(
        committees = summary.committees,
        contributions = summary.contribution_rows,
        expenses = summary.expense_rows,
        "Finished"
    );
    println!("Committees: {}", summary.committees);
    if summary.committees_without_reports > 0 {
        println!("   without report index: {}", summary.committees_without_reports);
    }
    println!(
        "Reports: {} fetched, {} cached, {} skipped",
        summary.reports_fetched, summary.reports_cached, summary.reports_skipped
    );
    println!(
        "Rows: {} contributions, {} expenses",
        summary.contribution_rows, summary.expense_rows
    );
    if !summary.errors.is_empty() {
        warn!("{} reports could not be processed", summary.errors.len());
        for e in &summary.errors {
            println!("   - {}", e);
        }
    }
}
