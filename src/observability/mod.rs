// Observability: logging, metrics, and the console progress meter

pub mod logging;
pub mod metrics;
pub mod progress;

pub use logging::{init_logging, Verbosity};
pub use progress::ConsoleProgressMeter;
