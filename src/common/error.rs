use thiserror::Error;

/// Why a single HTTP exchange failed. The fetcher never retries; callers decide
/// whether the failure is fatal for them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Transport { url, .. }
            | FetchError::Status { url, .. } => url,
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
        }
    }
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse failed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    /// Conditions that halt the run: the roster extent cannot be determined, or
    /// the cached roster is unusable.
    #[error("{0}")]
    Fatal(String),
}

impl ScraperError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::Fatal(_) | ScraperError::Cache(_))
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
