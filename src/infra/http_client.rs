use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder};
use tracing::debug;

use crate::app::ports::Fetcher;
use crate::common::error::{FetchError, Result, ScraperError};
use crate::config::HttpConfig;
use crate::observability::metrics;

/// Blocking reqwest-backed fetcher.
///
/// Holds two clients: the listing endpoint gets a short connect timeout and a
/// tight total budget, while report index pages and filings (which can be
/// large) get a longer connect timeout and a larger total budget.
pub struct ReqwestFetcher {
    listing: Client,
    detail: Client,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let listing = build_client(config, config.connect_timeout_ms, config.timeout_ms)?;
        let detail = build_client(config, config.detail_connect_timeout_ms, config.detail_timeout_ms)?;
        Ok(Self { listing, detail })
    }

    fn execute(&self, url: &str, request: RequestBuilder) -> std::result::Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let result = send(url, request);
        match &result {
            Ok(bytes) => {
                metrics::sources::request_success(started.elapsed().as_secs_f64(), bytes.len());
                debug!(url, bytes = bytes.len(), "Fetched");
            }
            Err(e) => {
                metrics::sources::request_error(e.kind());
                debug!(url, error = %e, "Fetch failed");
            }
        }
        result
    }
}

impl Fetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        self.execute(url, self.detail.get(url))
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> std::result::Result<Vec<u8>, FetchError> {
        self.execute(url, self.listing.post(url).form(fields))
    }
}

fn build_client(config: &HttpConfig, connect_ms: u64, total_ms: u64) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_millis(connect_ms))
        .timeout(Duration::from_millis(total_ms))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| ScraperError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn send(url: &str, request: RequestBuilder) -> std::result::Result<Vec<u8>, FetchError> {
    let resp = request.send().map_err(|e| classify(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = resp.bytes().map_err(|e| classify(url, e))?;
    Ok(bytes.to_vec())
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if let Some(status) = e.status() {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
