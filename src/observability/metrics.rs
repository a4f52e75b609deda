//! Run metrics for the campaign finance crawl.
//!
//! Values are recorded through the `metrics` facade. `init` installs a
//! Prometheus recorder; a batch run renders the exposition text once at the
//! end (`write_textfile`) for a node-exporter style text-file collector.
//! Without an installed recorder every call is a no-op.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, info};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources (HTTP)
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestDuration,
    SourcesPayloadBytes,

    // Roster crawl
    RosterPagesFetched,
    RosterCommitteesListed,
    RosterReportIndexErrors,
    RosterReportStubs,

    // Cache decisions
    CacheDecisions,

    // Report detail
    ReportsCached,
    ReportsFetched,
    ReportsSkipped,
    NormalizeSchedulesRewrapped,
    NormalizeDegenerateAddresses,
    NormalizeItemsDropped,

    // Export
    ExportRowsWritten,
    ExportAtomizedFiles,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesRequestsSuccess => "cf_sources_requests_success_total",
            MetricName::SourcesRequestsError => "cf_sources_requests_error_total",
            MetricName::SourcesRequestDuration => "cf_sources_request_duration_seconds",
            MetricName::SourcesPayloadBytes => "cf_sources_payload_bytes",

            MetricName::RosterPagesFetched => "cf_roster_pages_fetched_total",
            MetricName::RosterCommitteesListed => "cf_roster_committees_listed_total",
            MetricName::RosterReportIndexErrors => "cf_roster_report_index_errors_total",
            MetricName::RosterReportStubs => "cf_roster_report_stubs_total",

            MetricName::CacheDecisions => "cf_cache_decisions_total",

            MetricName::ReportsCached => "cf_reports_cached_total",
            MetricName::ReportsFetched => "cf_reports_fetched_total",
            MetricName::ReportsSkipped => "cf_reports_skipped_total",
            MetricName::NormalizeSchedulesRewrapped => "cf_normalize_schedules_rewrapped_total",
            MetricName::NormalizeDegenerateAddresses => "cf_normalize_degenerate_addresses_total",
            MetricName::NormalizeItemsDropped => "cf_normalize_items_dropped_total",

            MetricName::ExportRowsWritten => "cf_export_rows_written_total",
            MetricName::ExportAtomizedFiles => "cf_export_atomized_files_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is an error.
pub fn init() -> Result<(), String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE
        .set(handle)
        .map_err(|_| "Metrics system already initialized".to_string())?;
    info!("Metrics system initialized");
    Ok(())
}

/// Current exposition text, if a recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|h| h.render())
}

/// Write the exposition text to `path`. Returns false when no recorder is installed.
pub fn write_textfile(path: &Path) -> std::io::Result<bool> {
    match render() {
        Some(text) => {
            std::fs::write(path, text)?;
            debug!(path = %path.display(), "Wrote metrics text file");
            Ok(true)
        }
        None => Ok(false),
    }
}

pub mod sources {
    use super::MetricName;

    pub fn request_success(duration_secs: f64, payload_bytes: usize) {
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::SourcesRequestDuration.as_str()).record(duration_secs);
        ::metrics::histogram!(MetricName::SourcesPayloadBytes.as_str()).record(payload_bytes as f64);
    }

    pub fn request_error(kind: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestsError.as_str(), "kind" => kind).increment(1);
    }
}

pub mod roster {
    use super::MetricName;

    pub fn page_fetched(committees: usize) {
        ::metrics::counter!(MetricName::RosterPagesFetched.as_str()).increment(1);
        ::metrics::counter!(MetricName::RosterCommitteesListed.as_str()).increment(committees as u64);
    }

    pub fn report_index_error() {
        ::metrics::counter!(MetricName::RosterReportIndexErrors.as_str()).increment(1);
    }

    pub fn report_stubs(count: usize) {
        ::metrics::counter!(MetricName::RosterReportStubs.as_str()).increment(count as u64);
    }
}

pub mod cache {
    use super::MetricName;

    pub fn decision(outcome: &'static str) {
        ::metrics::counter!(MetricName::CacheDecisions.as_str(), "outcome" => outcome).increment(1);
    }
}

pub mod reports {
    use super::MetricName;

    pub fn cached() {
        ::metrics::counter!(MetricName::ReportsCached.as_str()).increment(1);
    }

    pub fn fetched() {
        ::metrics::counter!(MetricName::ReportsFetched.as_str()).increment(1);
    }

    pub fn skipped(reason: &'static str) {
        ::metrics::counter!(MetricName::ReportsSkipped.as_str(), "reason" => reason).increment(1);
    }
}

pub mod normalize {
    use super::MetricName;

    pub fn schedule_rewrapped(schedule: &'static str) {
        ::metrics::counter!(MetricName::NormalizeSchedulesRewrapped.as_str(), "schedule" => schedule)
            .increment(1);
    }

    pub fn degenerate_address() {
        ::metrics::counter!(MetricName::NormalizeDegenerateAddresses.as_str()).increment(1);
    }

    pub fn items_dropped(schedule: &'static str, count: usize) {
        ::metrics::counter!(MetricName::NormalizeItemsDropped.as_str(), "schedule" => schedule)
            .increment(count as u64);
    }
}

pub mod export {
    use super::MetricName;

    pub fn rows_written(schedule: &'static str, count: usize) {
        ::metrics::counter!(MetricName::ExportRowsWritten.as_str(), "schedule" => schedule)
            .increment(count as u64);
    }

    pub fn atomized_file(schedule: &'static str) {
        ::metrics::counter!(MetricName::ExportAtomizedFiles.as_str(), "schedule" => schedule)
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_follow_prometheus_conventions() {
        let all = [
            MetricName::SourcesRequestsSuccess,
            MetricName::RosterPagesFetched,
            MetricName::ReportsSkipped,
            MetricName::ExportRowsWritten,
        ];
        for name in all {
            let s = name.to_string();
            assert!(s.starts_with("cf_"), "{}", s);
            assert!(s.ends_with("_total"), "{}", s);
        }
        assert!(MetricName::SourcesRequestDuration.as_str().ends_with("_seconds"));
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        sources::request_error("timeout");
        export::rows_written("contributions", 3);
        let dir = tempfile::tempdir().unwrap();
        // Other tests never install a recorder, so nothing is written.
        if render().is_none() {
            assert!(!write_textfile(&dir.path().join("m.prom")).unwrap());
        }
    }
}
