use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::{Fetcher, Progress};
use crate::common::constants::UPSTREAM_ERROR_MARKER;
use crate::common::error::{FetchError, Result, ScraperError};
use crate::common::types::{Committee, Roster};
use crate::config::Config;
use crate::observability::metrics;
use crate::pipeline::ingestion::rate_limiter::PageThrottle;
use crate::pipeline::ingestion::report_index::ReportIndexScraper;

/// One page of the committee search endpoint.
#[derive(Debug, Deserialize)]
pub struct ListingPage {
    #[serde(rename = "RecordCount")]
    pub record_count: u64,
    #[serde(rename = "PageSize")]
    pub page_size: u64,
    #[serde(rename = "Committees", default)]
    pub committees: Vec<Value>,
}

impl ListingPage {
    pub fn last_page(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.record_count.div_ceil(self.page_size)
        }
    }
}

/// Walks the paginated committee listing and scrapes every committee's
/// report index, producing the roster.
pub struct CommitteeDirectoryBuilder<'a, F: Fetcher> {
    fetcher: &'a F,
    config: &'a Config,
    throttle: PageThrottle,
    progress: &'a mut dyn Progress,
}

impl<'a, F: Fetcher> CommitteeDirectoryBuilder<'a, F> {
    pub fn new(
        fetcher: &'a F,
        config: &'a Config,
        throttle: PageThrottle,
        progress: &'a mut dyn Progress,
    ) -> Self {
        Self {
            fetcher,
            config,
            throttle,
            progress,
        }
    }

    /// Build the roster. Failing to read page 1 is fatal, since the number of
    /// pages cannot be known without it. A failure on any later page ends the
    /// crawl early and keeps what was collected so far.
    #[instrument(skip(self))]
    pub fn build(mut self) -> Result<Roster> {
        let first = self.fetch_page(1).map_err(|e| {
            ScraperError::Fatal(format!("Could not retrieve first page of committees: {}", e))
        })?;
        if first.page_size == 0 {
            return Err(ScraperError::Fatal(
                "Committee listing reported a page size of zero".to_string(),
            ));
        }
        let last_page = first.last_page();
        info!(
            records = first.record_count,
            page_size = first.page_size,
            pages = last_page,
            "Iterating through committee records"
        );

        let scraper = ReportIndexScraper::new(self.fetcher, &self.config.source, &self.config.output);
        let mut roster = Roster::default();
        let mut codes = HashSet::new();
        let mut pending = Some(first);

        self.progress.begin(last_page as usize);
        for page_number in 1..=last_page {
            let page = match pending.take() {
                Some(page) => page,
                None => match self.fetch_page(page_number) {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(page = page_number, error = %e, "Listing page failed; keeping partial roster");
                        break;
                    }
                },
            };
            metrics::roster::page_fetched(page.committees.len());

            for raw in page.committees {
                let mut committee: Committee = match serde_json::from_value(raw) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(page = page_number, error = %e, "Malformed committee entry; skipping");
                        continue;
                    }
                };
                if !is_safe_code(&committee.code) {
                    warn!(code = %committee.code, "Committee code is not usable as a file name; skipping");
                    continue;
                }
                if !codes.insert(committee.code.clone()) {
                    warn!(code = %committee.code, "Committee listed twice; keeping the first");
                    continue;
                }
                committee.api_url = self.config.output.committee_api_url(&committee.code);

                match scraper.scrape(&committee.account_id) {
                    Ok(reports) => {
                        metrics::roster::report_stubs(reports.len());
                        debug!(committee = %committee.name, reports = reports.len(), "Reports retrieved");
                        committee.reports = reports;
                    }
                    Err(e) => {
                        metrics::roster::report_index_error();
                        warn!(committee = %committee.name, error = %e, "Report retrieval failed");
                        committee.reports_unavailable = true;
                    }
                }
                roster.committees.push(committee);
            }

            self.progress.advance(page_number as usize);
            self.throttle.pause();
        }
        self.progress.finish();

        info!(
            committees = roster.len(),
            reports = roster.report_count(),
            "Committee roster built"
        );
        Ok(roster)
    }

    fn fetch_page(&self, page: u64) -> Result<ListingPage> {
        let url = self.config.source.listing_url();
        let page_field = page.to_string();
        let body = self.fetcher.post_form(&url, &[("page", page_field.as_str())])?;
        parse_listing_page(&url, &body)
    }
}

/// Committee codes name output files, so they must be a single plain path
/// component.
fn is_safe_code(code: &str) -> bool {
    !code.is_empty()
        && code != "."
        && code != ".."
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Decode a listing response. The portal sometimes answers with a 2xx error
/// page, which counts as a failed fetch.
pub fn parse_listing_page(url: &str, body: &[u8]) -> Result<ListingPage> {
    let text = String::from_utf8_lossy(body);
    if text.contains(UPSTREAM_ERROR_MARKER) {
        return Err(FetchError::Transport {
            url: url.to_string(),
            message: "the portal returned an error page".to_string(),
        }
        .into());
    }
    Ok(serde_json::from_str(&text)?)
}
