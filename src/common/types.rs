use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::common::constants::{CONTRIBUTIONS, EXPENSES};

/// A registered filer as listed by the committee search endpoint, plus the
/// report stubs scraped from its report index.
///
/// Field names follow the upstream listing so the roster snapshot reads like
/// the source data. Any listing fields not modeled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    #[serde(rename = "AccountId", deserialize_with = "de_text")]
    pub account_id: String,
    #[serde(rename = "CommitteeCode", deserialize_with = "de_text")]
    pub code: String,
    #[serde(rename = "CommitteeName", default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(rename = "CandidateName", default, deserialize_with = "de_opt_text")]
    pub candidate_name: Option<String>,
    #[serde(rename = "CommitteeType", default, deserialize_with = "de_opt_text")]
    pub committee_type: Option<String>,
    #[serde(rename = "api_url", default)]
    pub api_url: String,
    #[serde(rename = "Reports", default)]
    pub reports: Vec<Report>,
    /// Set when the report index could not be scraped for this committee.
    #[serde(rename = "ReportsUnavailable", default, skip_serializing_if = "is_false")]
    pub reports_unavailable: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Committee {
    /// The report with the latest period end. Ties keep the earlier list position,
    /// which matches the upstream newest-first ordering when it holds.
    pub fn latest_report(&self) -> Option<&Report> {
        self.reports.iter().fold(None, |best: Option<&Report>, r| match best {
            Some(b) if b.period_end >= r.period_end => Some(b),
            _ => Some(r),
        })
    }
}

/// One filing stub from a committee's report index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "PeriodStart")]
    pub period_start: NaiveDate,
    #[serde(rename = "PeriodEnd")]
    pub period_end: NaiveDate,
    #[serde(rename = "DateFiled")]
    pub date_filed: NaiveDate,
    #[serde(rename = "Amendment", default, skip_serializing_if = "Option::is_none")]
    pub amendment: Option<String>,
    #[serde(rename = "Contributions", default)]
    pub contributions: String,
    #[serde(rename = "EndingBalance", default)]
    pub ending_balance: String,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "XmlUrl")]
    pub xml_url: String,
    #[serde(rename = "PdfUrl")]
    pub pdf_url: String,
    #[serde(rename = "api_url", default)]
    pub api_url: String,
}

impl Report {
    /// Absent and empty amendment text both mean "not an amendment".
    pub fn is_amendment(&self) -> bool {
        self.amendment.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// The full committee list for one run. Serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    pub committees: Vec<Committee>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.committees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committees.is_empty()
    }

    pub fn report_count(&self) -> usize {
        self.committees.iter().map(|c| c.reports.len()).sum()
    }
}

/// The two line-item schedules carried by a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    /// Schedule A
    Contributions,
    /// Schedule D
    Expenses,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::Contributions => CONTRIBUTIONS,
            Schedule::Expenses => EXPENSES,
        }
    }

    /// Container element and item element in the filing document.
    pub fn xml_path(&self) -> (&'static str, &'static str) {
        match self {
            Schedule::Contributions => ("ScheduleA", "LiA"),
            Schedule::Expenses => ("ScheduleD", "LiD"),
        }
    }

    /// Element holding the counterparty of each line item.
    pub fn party_element(&self) -> &'static str {
        match self {
            Schedule::Contributions => "Contributor",
            Schedule::Expenses => "Payee",
        }
    }
}

/// A flat row emitted for one schedule entry.
pub trait LineItem: Serialize {
    const SCHEDULE: Schedule;
    /// CSV header, in field order.
    const HEADERS: &'static [&'static str];

    fn amount(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub committee_code: String,
    pub report_id: String,
    pub individual: String,
    pub prefix: String,
    pub name_first: String,
    pub name_middle: String,
    pub name_last: String,
    pub address_1: String,
    pub address_2: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zip: String,
    pub employer: String,
    pub occupation: String,
    pub employment_place: String,
    pub date: String,
    pub amount: String,
    pub cumulative_amount: String,
}

impl LineItem for ContributionRecord {
    const SCHEDULE: Schedule = Schedule::Contributions;
    const HEADERS: &'static [&'static str] = &[
        "committee_code",
        "report_id",
        "individual",
        "prefix",
        "name_first",
        "name_middle",
        "name_last",
        "address_1",
        "address_2",
        "address_city",
        "address_state",
        "address_zip",
        "employer",
        "occupation",
        "employment_place",
        "date",
        "amount",
        "cumulative_amount",
    ];

    fn amount(&self) -> &str {
        &self.amount
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub committee_code: String,
    pub report_id: String,
    pub individual: String,
    pub prefix: String,
    pub name_first: String,
    pub name_middle: String,
    pub name_last: String,
    pub address_1: String,
    pub address_2: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zip: String,
    pub date: String,
    pub amount: String,
    pub authorized_by: String,
    pub purchased: String,
}

impl LineItem for ExpenseRecord {
    const SCHEDULE: Schedule = Schedule::Expenses;
    const HEADERS: &'static [&'static str] = &[
        "committee_code",
        "report_id",
        "individual",
        "prefix",
        "name_first",
        "name_middle",
        "name_last",
        "address_1",
        "address_2",
        "address_city",
        "address_state",
        "address_zip",
        "date",
        "amount",
        "authorized_by",
        "purchased",
    ];

    fn amount(&self) -> &str {
        &self.amount
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Scalar JSON values rendered as text. The listing endpoint is not consistent
/// about quoting identifiers.
pub(crate) fn value_to_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    match v {
        Value::Null => Ok(String::new()),
        other => value_to_text(&other)
            .ok_or_else(|| serde::de::Error::custom(format!("expected text, found {}", other))),
    }
}

fn de_opt_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(value_to_text(&v))
}
