use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the run is on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only (used under the progress meter).
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, progress_meter: bool) -> Self {
        if progress_meter {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "cf_scraper=warn",
            Verbosity::Normal => "cf_scraper=info",
            Verbosity::Verbose => "cf_scraper=debug",
        }
    }
}

/// Initializes logging with a console layer on stderr and a JSON file layer
/// rotated daily under `log_dir`. `RUST_LOG` directives are honored on top of
/// the verbosity default.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process.
pub fn init_logging(verbosity: Verbosity, log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(
        verbosity
            .directive()
            .parse::<Directive>()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );

    // A log directory we cannot create only costs us the file layer.
    if fs::create_dir_all(log_dir).is_err() {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer())
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, "cf_scraper.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer())
        .init();

    Some(guard)
}

/// Human-readable stderr output. Built per stack, since a layer is bound to
/// the subscriber it sits on.
fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer().with_writer(std::io::stderr).with_target(false)
}
