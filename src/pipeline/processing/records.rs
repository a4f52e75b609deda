use serde_json::Value;
use tracing::debug;

use crate::common::types::{value_to_text, ContributionRecord, ExpenseRecord, LineItem, Schedule};
use crate::observability::metrics;

/// The flat rows of one filing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportItems {
    pub contributions: Vec<ContributionRecord>,
    pub expenses: Vec<ExpenseRecord>,
}

impl ReportItems {
    /// Project both schedules of a canonical filing tree. Entries without an
    /// amount are dropped.
    pub fn extract(tree: &Value, committee_code: &str, report_id: &str) -> Self {
        Self {
            contributions: collect(tree, |item| contribution(item, committee_code, report_id)),
            expenses: collect(tree, |item| expense(item, committee_code, report_id)),
        }
    }
}

fn collect<T: LineItem>(tree: &Value, project: impl Fn(&Value) -> T) -> Vec<T> {
    let (container, item) = T::SCHEDULE.xml_path();
    let entries = tree[container][item].as_array().map(Vec::as_slice).unwrap_or_default();

    let records: Vec<T> = entries
        .iter()
        .map(project)
        .filter(|r| !r.amount().trim().is_empty())
        .collect();
    let dropped = entries.len() - records.len();
    if dropped > 0 {
        debug!(schedule = T::SCHEDULE.as_str(), dropped, "Dropped line items without an amount");
        metrics::normalize::items_dropped(T::SCHEDULE.as_str(), dropped);
    }
    records
}

fn contribution(item: &Value, committee_code: &str, report_id: &str) -> ContributionRecord {
    let party = &item[Schedule::Contributions.party_element()];
    ContributionRecord {
        committee_code: committee_code.to_string(),
        report_id: report_id.to_string(),
        individual: text(&party["@attributes"]["IsIndividual"]),
        prefix: text(&party["Prefix"]),
        name_first: text(&party["FirstName"]),
        name_middle: text(&party["MiddleName"]),
        name_last: text(&party["LastName"]),
        address_1: text(&party["Address"]["Line1"]),
        address_2: text(&party["Address"]["Line2"]),
        address_city: text(&party["Address"]["City"]),
        address_state: text(&party["Address"]["State"]),
        address_zip: text(&party["Address"]["ZipCode"]),
        employer: text(&party["NameOfEmployer"]),
        occupation: text(&party["OccupationOrTypeOfBusiness"]),
        employment_place: text(&party["PrimaryCityAndStateOfEmploymentOrBusiness"]),
        date: text(&item["TransactionDate"]),
        amount: text(&item["Amount"]),
        cumulative_amount: text(&item["TotalToDate"]),
    }
}

fn expense(item: &Value, committee_code: &str, report_id: &str) -> ExpenseRecord {
    let party = &item[Schedule::Expenses.party_element()];
    ExpenseRecord {
        committee_code: committee_code.to_string(),
        report_id: report_id.to_string(),
        individual: text(&party["@attributes"]["IsIndividual"]),
        prefix: text(&party["Prefix"]),
        name_first: text(&party["FirstName"]),
        name_middle: text(&party["MiddleName"]),
        name_last: text(&party["LastName"]),
        address_1: text(&party["Address"]["Line1"]),
        address_2: text(&party["Address"]["Line2"]),
        address_city: text(&party["Address"]["City"]),
        address_state: text(&party["Address"]["State"]),
        address_zip: text(&party["Address"]["ZipCode"]),
        date: text(&item["TransactionDate"]),
        amount: text(&item["Amount"]),
        authorized_by: text(&item["AuthorizingName"]),
        purchased: text(&item["ItemOrService"]),
    }
}

/// Missing and structured values both render as "".
fn text(value: &Value) -> String {
    value_to_text(value).unwrap_or_default()
}
