use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::common::constants::*;
use crate::common::error::{Result, ScraperError};

pub const DEFAULT_CONFIG_PATH: &str = "cf_scraper.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub http: HttpConfig,
    pub crawl: CrawlConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub listing_path: String,
    pub report_index_path: String,
    pub report_xml_path: String,
    pub report_pdf_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_path: LISTING_PATH.to_string(),
            report_index_path: REPORT_INDEX_PATH.to_string(),
            report_xml_path: REPORT_XML_PATH.to_string(),
            report_pdf_path: REPORT_PDF_PATH.to_string(),
        }
    }
}

impl SourceConfig {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn listing_url(&self) -> String {
        self.url(&self.listing_path)
    }

    pub fn report_index_url(&self, account_id: &str) -> String {
        format!("{}{}", self.url(&self.report_index_path), account_id)
    }

    pub fn report_xml_url(&self, report_id: &str) -> String {
        format!("{}{}", self.url(&self.report_xml_path), report_id)
    }

    pub fn report_pdf_url(&self, report_id: &str) -> String {
        format!("{}{}", self.url(&self.report_pdf_path), report_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout for the listing endpoint.
    pub connect_timeout_ms: u64,
    /// Total request budget for the listing endpoint.
    pub timeout_ms: u64,
    /// Connect timeout for report index and filing downloads.
    pub detail_connect_timeout_ms: u64,
    /// Total budget for report index and filing downloads.
    pub detail_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            detail_connect_timeout_ms: DEFAULT_DETAIL_CONNECT_TIMEOUT_MS,
            detail_timeout_ms: DEFAULT_DETAIL_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Wait after each listing page, bounding the request rate against the portal.
    pub page_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
        }
    }
}

impl CrawlConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_CACHE_AGE_SECS,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Public URL prefix of the published output, with a trailing slash.
    pub website_prefix: String,
    pub atomize: bool,
    /// Abbreviate street-type tokens in filing addresses. When off, addresses
    /// pass through unchanged.
    pub standardize_addresses: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            website_prefix: DEFAULT_WEBSITE_PREFIX.to_string(),
            atomize: false,
            standardize_addresses: true,
        }
    }
}

impl OutputConfig {
    pub fn committee_api_url(&self, code: &str) -> String {
        format!("{}{}/{}.json", self.website_prefix, COMMITTEES_DIR, code)
    }

    pub fn report_api_url(&self, report_id: &str) -> String {
        format!("{}{}/{}.json", self.website_prefix, REPORTS_DIR, report_id)
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            toml::from_str::<Config>(&content)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Environment overrides for the settings most often changed per deployment.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("CF_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Some(secs) = env_u64("CF_MAX_CACHE_AGE_SECS") {
            self.cache.max_age_secs = secs;
        }
        if let Some(ms) = env_u64("CF_PAGE_DELAY_MS") {
            self.crawl.page_delay_ms = ms;
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(ScraperError::Config("source.base_url must not be empty".into()));
        }
        if self.http.connect_timeout_ms == 0
            || self.http.timeout_ms == 0
            || self.http.detail_connect_timeout_ms == 0
            || self.http.detail_timeout_ms == 0
        {
            return Err(ScraperError::Config("HTTP timeouts must be greater than zero".into()));
        }
        if self.http.user_agent.trim().is_empty() {
            self.http.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        if !self.output.website_prefix.ends_with('/') {
            self.output.website_prefix.push('/');
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
