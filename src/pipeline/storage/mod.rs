// Pipeline storage: the roster snapshot, cached filings, and the exported files

pub mod cache;
pub mod export;
pub mod report_store;

pub use cache::{CacheDecision, CacheDirective, RebuildReason, RosterCache};
pub use export::{write_summary, CommitteeExport, ExportWriter, RowCounts};
pub use report_store::ReportStore;
