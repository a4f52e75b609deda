mod common;

use std::fs;

use anyhow::Result;
use cf_scraper::app::ports::NullProgress;
use cf_scraper::common::types::Roster;
use cf_scraper::pipeline::storage::CacheDirective;
use cf_scraper::{Pipeline, ScraperError};
use common::{line_count, FakePortal, ONE_CONTRIBUTION_XML, TWO_EXPENSES_XML};
use tempfile::tempdir;

fn load_roster(path: &std::path::Path) -> Roster {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn paginates_through_the_whole_listing() -> Result<()> {
    let dir = tempdir()?;
    let portal = FakePortal::new(dir.path(), 25, 10);

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;

    assert_eq!(*portal.listing_requests.borrow(), vec!["1", "2", "3"]);
    assert_eq!(summary.committees, 25);
    assert!(summary.roster_rebuilt);

    let roster = load_roster(&dir.path().join("committees.json"));
    assert_eq!(roster.len(), 25);
    assert_eq!(roster.committees[24].code, FakePortal::code(24));
    // No report index was served, so every committee is kept without reports.
    assert!(roster.committees.iter().all(|c| c.reports.is_empty() && c.reports_unavailable));
    assert_eq!(roster.committees[0].extra["Party"], "Independent");
    assert_eq!(
        roster.committees[0].api_url,
        "http://openva.com/campaign-finance/committees/PAC-000.json"
    );
    assert_eq!(line_count(&dir.path().join("committees.csv")), 26);
    Ok(())
}

#[test]
fn single_contribution_and_empty_expenses_emit_one_row() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 1, 10);
    portal.with_reports(0, &["5001"]);
    portal.with_filing("5001", ONE_CONTRIBUTION_XML);

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert_eq!(summary.reports_fetched, 1);
    assert_eq!(summary.contribution_rows, 1);
    assert_eq!(summary.expense_rows, 0);

    let root = dir.path();
    let tree: serde_json::Value = serde_json::from_str(&fs::read_to_string(root.join("reports/5001.json"))?)?;
    assert_eq!(tree["ScheduleA"]["LiA"].as_array().map(Vec::len), Some(1));
    assert_eq!(tree["ScheduleD"]["LiD"].as_array().map(Vec::len), Some(0));
    assert_eq!(tree["ScheduleA"]["LiA"][0]["Contributor"]["Address"]["Line1"], "12 Oak Ln.");

    assert_eq!(line_count(&root.join("contributions.csv")), 2);
    assert_eq!(line_count(&root.join("expenses.csv")), 1);
    let row = fs::read_to_string(root.join("contributions/PAC-000.csv"))?;
    assert!(row.lines().nth(1).unwrap().starts_with("PAC-000,5001,true,,Pat,,Doe,12 Oak Ln.,,Norfolk,VA,23510"));
    Ok(())
}

#[test]
fn failed_filing_fetch_is_skipped_and_the_run_continues() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 2, 10);
    portal.with_reports(0, &["6001", "6002"]);
    portal.with_reports(1, &["6003"]);
    // 6001 has no filing behind it.
    portal.with_filing("6002", ONE_CONTRIBUTION_XML);
    portal.with_filing("6003", TWO_EXPENSES_XML);

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert_eq!(summary.reports_skipped, 1);
    assert_eq!(summary.reports_fetched, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(!dir.path().join("reports/6001.json").exists());
    assert!(dir.path().join("reports/6003.json").exists());
    assert_eq!(summary.expense_rows, 2);

    // The stub is still part of the committee.
    let committee: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("committees/PAC-000.json"))?)?;
    assert_eq!(committee["Reports"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn malformed_filing_is_skipped_and_retried_next_run() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 1, 10);
    portal.with_reports(0, &["9001", "9002"]);
    portal.with_filing("9001", "<Report><ScheduleA></Report>");
    portal.with_filing("9002", ONE_CONTRIBUTION_XML);

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert_eq!(summary.reports_skipped, 1);
    assert_eq!(summary.reports_fetched, 1);
    assert_eq!(summary.contribution_rows, 1);
    assert!(!dir.path().join("reports/9001.json").exists());
    assert!(dir.path().join("reports/9002.json").exists());
    assert_eq!(line_count(&dir.path().join("contributions.csv")), 2);
    assert_eq!(line_count(&dir.path().join("contributions/PAC-000.csv")), 2);

    let committee: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("committees/PAC-000.json"))?)?;
    let ids: Vec<_> = committee["Reports"]
        .as_array()
        .map(|reports| reports.iter().map(|r| r["Id"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["9001", "9002"]);

    // Once the portal serves a valid filing, the next run picks it up.
    portal.with_filing("9001", TWO_EXPENSES_XML);
    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert_eq!(summary.reports_skipped, 0);
    assert_eq!(summary.reports_fetched, 1);
    assert_eq!(summary.reports_cached, 1);
    assert_eq!(summary.expense_rows, 2);
    assert!(dir.path().join("reports/9001.json").exists());
    Ok(())
}

#[test]
fn fresh_snapshot_skips_the_listing_and_cached_filings_skip_the_fetch() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 3, 10);
    portal.with_reports(2, &["7001"]);
    portal.with_filing("7001", ONE_CONTRIBUTION_XML);

    Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    let listing_after_first = portal.listing_requests.borrow().len();
    let gets_after_first = portal.get_requests.borrow().len();

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert!(!summary.roster_rebuilt);
    assert_eq!(summary.committees, 3);
    assert_eq!(summary.reports_cached, 1);
    assert_eq!(summary.reports_fetched, 0);
    assert_eq!(portal.listing_requests.borrow().len(), listing_after_first);
    assert_eq!(portal.get_requests.borrow().len(), gets_after_first);
    // Aggregates are rebuilt from the cached filing, not appended to.
    assert_eq!(line_count(&dir.path().join("contributions.csv")), 2);
    Ok(())
}

#[test]
fn reload_rebuilds_a_fresh_snapshot() -> Result<()> {
    let dir = tempdir()?;
    let portal = FakePortal::new(dir.path(), 3, 10);
    Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Reload, &mut NullProgress)?;
    assert!(summary.roster_rebuilt);
    assert_eq!(*portal.listing_requests.borrow(), vec!["1", "1"]);
    Ok(())
}

#[test]
fn per_committee_rows_sum_to_the_aggregate() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 4, 2);
    for n in 0..4 {
        let id = format!("80{}", n);
        portal.with_reports(n, &[id.as_str()]);
        portal.with_filing(&id, if n % 2 == 0 { ONE_CONTRIBUTION_XML } else { TWO_EXPENSES_XML });
    }
    Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;

    let root = dir.path();
    for schedule in ["contributions", "expenses"] {
        let per_committee: usize = (0..4)
            .map(|n| line_count(&root.join(schedule).join(format!("{}.csv", FakePortal::code(n)))) - 1)
            .sum();
        let aggregate = line_count(&root.join(format!("{}.csv", schedule))) - 1;
        assert_eq!(per_committee, aggregate, "{}", schedule);
    }
    assert_eq!(line_count(&root.join("expenses.csv")) - 1, 4);
    Ok(())
}

#[test]
fn later_page_failure_keeps_the_partial_roster() -> Result<()> {
    let dir = tempdir()?;
    let mut portal = FakePortal::new(dir.path(), 25, 10);
    portal.fail_page(2);

    let summary = Pipeline::new(&portal, &portal.config).run(CacheDirective::Auto, &mut NullProgress)?;
    assert_eq!(summary.committees, 10);
    assert_eq!(*portal.listing_requests.borrow(), vec!["1", "2"]);
    Ok(())
}

#[test]
fn first_page_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let mut portal = FakePortal::new(dir.path(), 25, 10);
    portal.fail_page(1);

    let err = Pipeline::new(&portal, &portal.config)
        .run(CacheDirective::Auto, &mut NullProgress)
        .unwrap_err();
    assert!(matches!(err, ScraperError::Fatal(_)));
    assert!(!dir.path().join("committees.json").exists());
}

#[test]
fn corrupt_snapshot_is_fatal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("committees.json"), "[{").unwrap();
    let portal = FakePortal::new(dir.path(), 1, 10);

    let err = Pipeline::new(&portal, &portal.config)
        .run(CacheDirective::FromCache, &mut NullProgress)
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(portal.listing_requests.borrow().is_empty());
}
