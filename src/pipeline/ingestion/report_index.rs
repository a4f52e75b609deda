use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use crate::app::ports::Fetcher;
use crate::common::constants::REPORT_ROW_SELECTOR;
use crate::common::error::{Result, ScraperError};
use crate::common::types::Report;
use crate::config::{OutputConfig, SourceConfig};

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(REPORT_ROW_SELECTOR).expect("static selector"));
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

// `%Y` also accepts a two-digit year as year 00NN, so `%y` must be tried
// first. It takes exactly two digits and rejects four-digit years.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%b %d, %Y", "%B %d, %Y"];

/// The six cells of a report row, in table order. This is the fixed contract
/// with the portal's report index markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReportRow {
    pub period: String,
    pub amendment: String,
    pub date_filed: String,
    pub contributions: String,
    pub ending_balance: String,
    pub href: String,
}

/// Scrapes a committee's report index page into report stubs.
pub struct ReportIndexScraper<'a, F: Fetcher> {
    fetcher: &'a F,
    source: &'a SourceConfig,
    output: &'a OutputConfig,
}

impl<'a, F: Fetcher> ReportIndexScraper<'a, F> {
    pub fn new(fetcher: &'a F, source: &'a SourceConfig, output: &'a OutputConfig) -> Self {
        Self {
            fetcher,
            source,
            output,
        }
    }

    /// Fetch and parse the report index for `account_id`. Fetch failures are
    /// returned to the caller; malformed rows are logged and skipped.
    #[instrument(skip(self))]
    pub fn scrape(&self, account_id: &str) -> Result<Vec<Report>> {
        let url = self.source.report_index_url(account_id);
        let body = self.fetcher.get(&url)?;
        let html = String::from_utf8_lossy(&body);
        let reports = self.parse(&html)?;
        debug!(count = reports.len(), "Parsed report index");
        Ok(reports)
    }

    pub fn parse(&self, html: &str) -> Result<Vec<Report>> {
        let base = Url::parse(&self.source.base_url)
            .map_err(|e| ScraperError::Config(format!("invalid base_url '{}': {}", self.source.base_url, e)))?;
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let mut reports = Vec::new();
        for (index, row) in document.select(&ROW_SELECTOR).enumerate() {
            let Some(raw) = extract_row(row) else {
                warn!(row = index, "Report row has fewer than six cells or no link; skipping");
                continue;
            };
            match self.translate(&base, raw) {
                Ok(report) => {
                    if seen.insert(report.id.clone()) {
                        reports.push(report);
                    } else {
                        warn!(row = index, report_id = %report.id, "Duplicate report id; keeping the first");
                    }
                }
                Err(e) => warn!(row = index, error = %e, "Unparseable report row; skipping"),
            }
        }
        Ok(reports)
    }

    /// Turn the raw cell text of one row into a report stub.
    pub fn translate(&self, base: &Url, raw: RawReportRow) -> Result<Report> {
        let link = base
            .join(&raw.href)
            .map_err(|e| ScraperError::Parse(format!("bad report link '{}': {}", raw.href, e)))?;
        let id = link
            .path_segments()
            .and_then(|mut segments| segments.nth(2))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ScraperError::Parse(format!("no report id in link '{}'", raw.href)))?;

        let (period_start, period_end) = parse_period(&raw.period)?;
        let date_filed = parse_date(&raw.date_filed)
            .ok_or_else(|| ScraperError::Parse(format!("bad filing date '{}'", raw.date_filed)))?;

        Ok(Report {
            period_start,
            period_end,
            date_filed,
            amendment: Some(raw.amendment).filter(|a| !a.is_empty()),
            contributions: raw.contributions,
            ending_balance: raw.ending_balance,
            url: link.to_string(),
            xml_url: self.source.report_xml_url(&id),
            pdf_url: self.source.report_pdf_url(&id),
            api_url: self.output.report_api_url(&id),
            id,
        })
    }
}

/// Read the six fixed cells of a report row. `None` when the row is short or
/// the sixth cell has no link.
pub fn extract_row(row: ElementRef<'_>) -> Option<RawReportRow> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL_SELECTOR).take(6).collect();
    if cells.len() < 6 {
        return None;
    }
    let href = cells[5]
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(clean_text)?;
    Some(RawReportRow {
        period: cell_text(cells[0]),
        amendment: cell_text(cells[1]),
        date_filed: cell_text(cells[2]),
        contributions: cell_text(cells[3]),
        ending_balance: cell_text(cells[4]),
        href,
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    clean_text(&cell.text().collect::<String>())
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Split "MM/DD/YYYY to MM/DD/YYYY" into its two dates.
pub fn parse_period(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let tokens: Vec<&str> = period.split_whitespace().collect();
    let bad = || ScraperError::Parse(format!("bad filing period '{}'", period));
    if tokens.len() < 3 {
        return Err(bad());
    }
    let start = parse_date(tokens[0]).ok_or_else(bad)?;
    let end = parse_date(tokens[2]).ok_or_else(bad)?;
    if start > end {
        return Err(ScraperError::Parse(format!(
            "filing period '{}' starts after it ends",
            period
        )));
    }
    Ok((start, end))
}

/// Parse the portal's date text. Trailing time-of-day text is ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let first = text.split_whitespace().next().unwrap_or("");
    [text, first].iter().find_map(|candidate| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    })
}
