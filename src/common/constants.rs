/// Upstream endpoints and fixed names shared across the crawl and the exporter.
/// Endpoint paths are defaults; `Config` can override the host and paths.

// Upstream portal
pub const DEFAULT_BASE_URL: &str = "http://cfreports.sbe.virginia.gov";
pub const LISTING_PATH: &str = "/Home/SearchCommittees";
pub const REPORT_INDEX_PATH: &str = "/Committee/Index/";
pub const REPORT_XML_PATH: &str = "/Report/ReportXML/";
pub const REPORT_PDF_PATH: &str = "/Report/ReportPDF/";

// Public site where the exported files are published
pub const DEFAULT_WEBSITE_PREFIX: &str = "http://openva.com/campaign-finance/";

/// Body text the listing endpoint serves (with a 2xx status) when it fails internally.
pub const UPSTREAM_ERROR_MARKER: &str = "An error occurred while processing your request";

/// CSS selector for the rows of the per-committee report index.
pub const REPORT_ROW_SELECTOR: &str = "tr.report";

// Timing defaults
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DETAIL_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_DETAIL_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_CACHE_AGE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_USER_AGENT: &str = concat!("cf_scraper/", env!("CARGO_PKG_VERSION"));

// Output layout, relative to the output directory
pub const ROSTER_FILE: &str = "committees.json";
pub const SUMMARY_FILE: &str = "committees.csv";
pub const COMMITTEES_DIR: &str = "committees";
pub const REPORTS_DIR: &str = "reports";
pub const CONTRIBUTIONS: &str = "contributions";
pub const EXPENSES: &str = "expenses";
pub const METRICS_FILE: &str = "metrics.prom";

/// Width of the zero-padded file names used for atomized transactions.
pub const ATOMIZED_INDEX_WIDTH: usize = 5;
