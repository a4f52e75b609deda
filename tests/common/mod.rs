//! An in-memory stand-in for the portal, shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use cf_scraper::app::ports::Fetcher;
use cf_scraper::config::Config;
use cf_scraper::FetchError;
use serde_json::json;

pub const ONE_CONTRIBUTION_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Report>
  <ReportHeader>
    <Address><Line1>1 Capitol Square</Line1><City>Richmond</City></Address>
  </ReportHeader>
  <ScheduleA>
    <LiA>
      <Contributor IsIndividual="true">
        <FirstName>Pat</FirstName>
        <LastName>Doe</LastName>
        <Address><Line1>12 Oak Lane</Line1><Line2></Line2><City>Norfolk</City><State>VA</State><ZipCode>23510</ZipCode></Address>
      </Contributor>
      <TransactionDate>2013-02-01</TransactionDate>
      <Amount>250.00</Amount>
      <TotalToDate>250.00</TotalToDate>
    </LiA>
  </ScheduleA>
  <ScheduleD></ScheduleD>
</Report>"#;

pub const TWO_EXPENSES_XML: &str = r#"<Report>
  <ScheduleD>
    <LiD><Payee IsIndividual="false"><LastName>Print Shop</LastName></Payee><Amount>75.00</Amount><ItemOrService>Flyers</ItemOrService></LiD>
    <LiD><Payee IsIndividual="false"><LastName>Diner</LastName></Payee><Amount>20.00</Amount><ItemOrService>Lunch</ItemOrService></LiD>
  </ScheduleD>
</Report>"#;

/// Serves listing pages, report indexes, and filings from memory, and records
/// every request it receives.
pub struct FakePortal {
    pub config: Config,
    record_count: usize,
    page_size: usize,
    failing_pages: HashSet<usize>,
    bodies: HashMap<String, Vec<u8>>,
    pub listing_requests: RefCell<Vec<String>>,
    pub get_requests: RefCell<Vec<String>>,
}

impl FakePortal {
    /// A portal listing `record_count` committees, `PAC-000` onwards, with no
    /// report indexes yet.
    pub fn new(output_dir: &Path, record_count: usize, page_size: usize) -> Self {
        let mut config = Config::default();
        config.output.dir = output_dir.to_path_buf();
        config.crawl.page_delay_ms = 0;
        Self {
            config,
            record_count,
            page_size,
            failing_pages: HashSet::new(),
            bodies: HashMap::new(),
            listing_requests: RefCell::new(Vec::new()),
            get_requests: RefCell::new(Vec::new()),
        }
    }

    pub fn code(n: usize) -> String {
        format!("PAC-{:03}", n)
    }

    pub fn account(n: usize) -> String {
        format!("ACC{}", n)
    }

    pub fn fail_page(&mut self, page: usize) {
        self.failing_pages.insert(page);
    }

    /// Give committee `n` a report index listing `report_ids`, newest first.
    pub fn with_reports(&mut self, n: usize, report_ids: &[&str]) {
        let rows: String = report_ids
            .iter()
            .map(|id| {
                format!(
                    r#"<tr class="report"><td>01/01/2013 to 03/31/2013</td><td></td><td>04/15/2013</td><td>$250.00</td><td>$1,000.00</td><td><a href="/Report/Index/{}">View</a></td></tr>"#,
                    id
                )
            })
            .collect();
        let html = format!("<html><body><table>{}</table></body></html>", rows);
        let url = self.config.source.report_index_url(&Self::account(n));
        self.bodies.insert(url, html.into_bytes());
    }

    pub fn with_filing(&mut self, report_id: &str, xml: &str) {
        let url = self.config.source.report_xml_url(report_id);
        self.bodies.insert(url, xml.as_bytes().to_vec());
    }

    fn page(&self, page: usize) -> Vec<u8> {
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.record_count);
        let committees: Vec<_> = (start..end)
            .map(|n| {
                json!({
                    "AccountId": Self::account(n),
                    "CommitteeCode": Self::code(n),
                    "CommitteeName": format!("Committee {}", n),
                    "CandidateName": format!("Candidate {}", n),
                    "CommitteeType": "Candidate Campaign Committee",
                    "Party": "Independent"
                })
            })
            .collect();
        serde_json::to_vec(&json!({
            "RecordCount": self.record_count,
            "PageSize": self.page_size,
            "Committees": committees
        }))
        .unwrap()
    }
}

impl Fetcher for FakePortal {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_requests.borrow_mut().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        let page = fields
            .iter()
            .find(|(k, _)| *k == "page")
            .map(|(_, v)| v.to_string())
            .unwrap_or_default();
        self.listing_requests.borrow_mut().push(page.clone());
        let number: usize = page.parse().unwrap_or(0);
        if number == 0 || self.failing_pages.contains(&number) {
            return Err(FetchError::Timeout { url: url.to_string() });
        }
        Ok(self.page(number))
    }
}

pub fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
