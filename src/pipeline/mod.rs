// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod storage;

use serde::Serialize;
use std::fs;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::{AddressNormalizer, Fetcher, Progress};
use crate::common::error::Result;
use crate::common::types::Committee;
use crate::config::Config;
use crate::observability::metrics;
use ingestion::{CommitteeDirectoryBuilder, PageThrottle};
use processing::{select_normalizer, ReportDetailNormalizer, ReportItems};
use storage::{CacheDecision, CacheDirective, ExportWriter, ReportStore, RosterCache, RowCounts};

/// Result of a complete run
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub roster_rebuilt: bool,
    pub committees: usize,
    pub committees_without_reports: usize,
    pub reports_cached: usize,
    pub reports_fetched: usize,
    pub reports_skipped: usize,
    pub contribution_rows: usize,
    pub expense_rows: usize,
    pub errors: Vec<String>,
    pub duration_secs: f64,
}

/// Drives one batch run: decide the roster source, build or load the roster,
/// then export every committee's filings.
pub struct Pipeline<'a, F: Fetcher> {
    fetcher: &'a F,
    config: &'a Config,
    addresses: Box<dyn AddressNormalizer>,
}

impl<'a, F: Fetcher> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a Config) -> Self {
        Self {
            fetcher,
            config,
            addresses: select_normalizer(config.output.standardize_addresses),
        }
    }

    /// Run the whole crawl. Only roster failures are returned as errors; a
    /// filing that cannot be fetched or parsed is logged and skipped.
    #[instrument(skip(self, progress))]
    pub fn run(&self, directive: CacheDirective, progress: &mut dyn Progress) -> Result<RunSummary> {
        let started = Instant::now();
        let root = &self.config.output.dir;
        fs::create_dir_all(root)?;

        let mut summary = RunSummary::default();
        let cache = RosterCache::new(root, self.config.cache.max_age());
        let roster = match cache.decide(directive) {
            CacheDecision::Fresh => cache.load()?,
            CacheDecision::Rebuild(reason) => {
                info!(?reason, "Rebuilding committee roster");
                let throttle = PageThrottle::new(self.config.crawl.page_delay());
                let roster =
                    CommitteeDirectoryBuilder::new(self.fetcher, self.config, throttle, progress).build()?;
                cache.save(&roster)?;
                summary.roster_rebuilt = true;
                roster
            }
        };
        summary.committees = roster.len();
        summary.committees_without_reports = roster
            .committees
            .iter()
            .filter(|c| c.reports_unavailable)
            .count();

        let store = ReportStore::open(root)?;
        let mut writer = ExportWriter::create(root, self.config.output.atomize)?;
        for committee in &roster.committees {
            let rows = self.export_committee(&mut writer, &store, committee, &mut summary)?;
            debug!(code = %committee.code, contributions = rows.contributions, expenses = rows.expenses, "Committee exported");
        }
        let totals = writer.finish(&roster)?;
        summary.contribution_rows = totals.contributions;
        summary.expense_rows = totals.expenses;
        summary.duration_secs = started.elapsed().as_secs_f64();

        info!(
            committees = summary.committees,
            fetched = summary.reports_fetched,
            cached = summary.reports_cached,
            skipped = summary.reports_skipped,
            "Run complete"
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(code = %committee.code))]
    fn export_committee(
        &self,
        writer: &mut ExportWriter,
        store: &ReportStore,
        committee: &Committee,
        summary: &mut RunSummary,
    ) -> Result<RowCounts> {
        let path = writer.write_committee(committee)?;
        info!(committee = %committee.name, path = %path.display(), "Committee saved");

        let normalizer = ReportDetailNormalizer::new(self.addresses.as_ref());
        let mut export = writer.begin_committee(committee)?;
        for report in &committee.reports {
            let tree = match store.load(&report.id) {
                Some(tree) => {
                    metrics::reports::cached();
                    summary.reports_cached += 1;
                    tree
                }
                None => {
                    let body = match self.fetcher.get(&report.xml_url) {
                        Ok(body) => body,
                        Err(e) => {
                            warn!(committee = %committee.name, report_id = %report.id, error = %e, "Report could not be retrieved");
                            metrics::reports::skipped("fetch");
                            summary.reports_skipped += 1;
                            summary.errors.push(format!("report {}: {}", report.id, e));
                            continue;
                        }
                    };
                    let tree = match normalizer.normalize(&body) {
                        Ok(tree) => tree,
                        Err(e) => {
                            warn!(committee = %committee.name, report_id = %report.id, error = %e, "Report skipped; invalid XML");
                            metrics::reports::skipped("invalid");
                            summary.reports_skipped += 1;
                            summary.errors.push(format!("report {}: {}", report.id, e));
                            continue;
                        }
                    };
                    store.save(&report.id, &tree)?;
                    metrics::reports::fetched();
                    summary.reports_fetched += 1;
                    tree
                }
            };
            let items = ReportItems::extract(&tree, &committee.code, &report.id);
            export.write_items(committee, report, &items)?;
        }
        export.finish()
    }
}
