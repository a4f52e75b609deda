// Pipeline ingestion: the roster crawl, report index scraping, and page pacing

pub mod committee_directory;
pub mod rate_limiter;
pub mod report_index;

pub use committee_directory::{CommitteeDirectoryBuilder, ListingPage};
pub use rate_limiter::PageThrottle;
pub use report_index::ReportIndexScraper;
