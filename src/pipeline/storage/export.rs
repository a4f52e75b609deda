use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::common::constants::*;
use crate::common::error::Result;
use crate::common::types::{Committee, ContributionRecord, ExpenseRecord, LineItem, Report, Roster};
use crate::observability::metrics;
use crate::pipeline::processing::records::ReportItems;

/// Rows written for one committee.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub contributions: usize,
    pub expenses: usize,
}

impl std::ops::AddAssign for RowCounts {
    fn add_assign(&mut self, other: Self) {
        self.contributions += other.contributions;
        self.expenses += other.expenses;
    }
}

/// Writes the output directory: entity JSON files, the per-committee and
/// run-wide schedule files, optional atomized transactions, and the summary.
///
/// The run-wide CSVs are truncated and opened once when the writer is created
/// and stay open until `finish`.
pub struct ExportWriter {
    root: PathBuf,
    atomize: bool,
    contributions: AggregateCsv<ContributionRecord>,
    expenses: AggregateCsv<ExpenseRecord>,
}

impl ExportWriter {
    pub fn create(root: &Path, atomize: bool) -> Result<Self> {
        for dir in [COMMITTEES_DIR, CONTRIBUTIONS, EXPENSES] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
            atomize,
            contributions: AggregateCsv::truncate(&root.join(format!("{}.csv", CONTRIBUTIONS)))?,
            expenses: AggregateCsv::truncate(&root.join(format!("{}.csv", EXPENSES)))?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_committee(&self, committee: &Committee) -> Result<PathBuf> {
        let path = self
            .root
            .join(COMMITTEES_DIR)
            .join(format!("{}.json", committee.code));
        fs::write(&path, serde_json::to_vec(committee)?)?;
        Ok(path)
    }

    /// Open the per-committee schedule files, replacing any from earlier runs.
    pub fn begin_committee(&mut self, committee: &Committee) -> Result<CommitteeExport<'_>> {
        let contributions = CommitteeFiles::create(&self.root.join(CONTRIBUTIONS), &committee.code)?;
        let expenses = CommitteeFiles::create(&self.root.join(EXPENSES), &committee.code)?;
        Ok(CommitteeExport {
            writer: self,
            contributions,
            expenses,
        })
    }

    /// Flush the run-wide files and write the committee summary.
    pub fn finish(self, roster: &Roster) -> Result<RowCounts> {
        let totals = RowCounts {
            contributions: self.contributions.finish()?,
            expenses: self.expenses.finish()?,
        };
        write_summary(&self.root.join(SUMMARY_FILE), roster)?;
        info!(
            contributions = totals.contributions,
            expenses = totals.expenses,
            "Export complete"
        );
        Ok(totals)
    }

    fn write_atomized<T: LineItem>(&self, committee: &Committee, report: &Report, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let dir = self
            .root
            .join(T::SCHEDULE.as_str())
            .join(&committee.code)
            .join(&report.id);
        fs::create_dir_all(&dir)?;
        for (index, record) in records.iter().enumerate() {
            let path = dir.join(format!("{:0width$}.json", index, width = ATOMIZED_INDEX_WIDTH));
            let transaction = AtomizedTransaction {
                record,
                committee_name: &committee.name,
                candidate_name: committee.candidate_name.as_deref(),
                report_period_start: report.period_start.to_string(),
                report_period_end: report.period_end.to_string(),
                report_date_filed: report.date_filed.to_string(),
                report_url: &report.url,
            };
            fs::write(&path, serde_json::to_vec(&transaction)?)?;
            metrics::export::atomized_file(T::SCHEDULE.as_str());
        }
        Ok(())
    }
}

/// One committee's schedule files, open while its reports are processed.
pub struct CommitteeExport<'w> {
    writer: &'w mut ExportWriter,
    contributions: CommitteeFiles<ContributionRecord>,
    expenses: CommitteeFiles<ExpenseRecord>,
}

impl CommitteeExport<'_> {
    /// Append one report's rows to the committee files and the run-wide files.
    pub fn write_items(&mut self, committee: &Committee, report: &Report, items: &ReportItems) -> Result<()> {
        for record in &items.contributions {
            self.contributions.append(record)?;
            self.writer.contributions.append(record)?;
        }
        for record in &items.expenses {
            self.expenses.append(record)?;
            self.writer.expenses.append(record)?;
        }
        metrics::export::rows_written(CONTRIBUTIONS, items.contributions.len());
        metrics::export::rows_written(EXPENSES, items.expenses.len());

        if self.writer.atomize {
            self.writer.write_atomized(committee, report, &items.contributions)?;
            self.writer.write_atomized(committee, report, &items.expenses)?;
        }
        Ok(())
    }

    /// Close the committee files.
    pub fn finish(self) -> Result<RowCounts> {
        Ok(RowCounts {
            contributions: self.contributions.finish()?,
            expenses: self.expenses.finish()?,
        })
    }
}

/// `<schedule>/<code>.csv` and `<schedule>/<code>.json` for one committee. The
/// JSON array is streamed: opened on creation, closed by `finish`.
struct CommitteeFiles<T> {
    csv: csv::Writer<File>,
    json: BufWriter<File>,
    rows: usize,
    _record: PhantomData<T>,
}

impl<T: LineItem> CommitteeFiles<T> {
    fn create(dir: &Path, code: &str) -> Result<Self> {
        let mut csv = WriterBuilder::new()
            .has_headers(false)
            .from_path(dir.join(format!("{}.csv", code)))?;
        csv.write_record(T::HEADERS)?;
        let mut json = BufWriter::new(File::create(dir.join(format!("{}.json", code)))?);
        json.write_all(b"[")?;
        Ok(Self {
            csv,
            json,
            rows: 0,
            _record: PhantomData,
        })
    }

    fn append(&mut self, record: &T) -> Result<()> {
        self.csv.serialize(record)?;
        if self.rows > 0 {
            self.json.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.json, record)?;
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        self.csv.flush()?;
        self.json.write_all(b"]")?;
        self.json.flush()?;
        Ok(self.rows)
    }
}

/// A run-wide schedule CSV.
struct AggregateCsv<T> {
    csv: csv::Writer<File>,
    rows: usize,
    _record: PhantomData<T>,
}

impl<T: LineItem> AggregateCsv<T> {
    /// Truncate `path`, then keep it open in append mode. The header goes in
    /// only if the file is empty at that point.
    fn truncate(path: &Path) -> Result<Self> {
        File::create(path)?;
        let file = OpenOptions::new().append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        let mut csv = WriterBuilder::new().has_headers(false).from_writer(file);
        if empty {
            csv.write_record(T::HEADERS)?;
        }
        Ok(Self {
            csv,
            rows: 0,
            _record: PhantomData,
        })
    }

    fn append(&mut self, record: &T) -> Result<()> {
        self.csv.serialize(record)?;
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        self.csv.flush()?;
        Ok(self.rows)
    }
}

#[derive(Serialize)]
struct AtomizedTransaction<'a, T: Serialize> {
    #[serde(flatten)]
    record: &'a T,
    committee_name: &'a str,
    candidate_name: Option<&'a str>,
    report_period_start: String,
    report_period_end: String,
    report_date_filed: String,
    report_url: &'a str,
}

const SUMMARY_HEADERS: &[&str] = &["Code", "Name", "Candidate", "Type", "Balance", "Date"];

#[derive(Serialize)]
struct SummaryRow<'a> {
    code: &'a str,
    name: &'a str,
    candidate: &'a str,
    committee_type: &'a str,
    balance: &'a str,
    date: String,
}

/// `committees.csv`: one row per committee with the balance and period end of
/// its latest report.
pub fn write_summary(path: &Path, roster: &Roster) -> Result<()> {
    let mut csv = WriterBuilder::new().has_headers(false).from_path(path)?;
    csv.write_record(SUMMARY_HEADERS)?;
    for committee in &roster.committees {
        let latest = committee.latest_report();
        csv.serialize(SummaryRow {
            code: &committee.code,
            name: &committee.name,
            candidate: committee.candidate_name.as_deref().unwrap_or_default(),
            committee_type: committee.committee_type.as_deref().unwrap_or_default(),
            balance: latest.map(|r| r.ending_balance.as_str()).unwrap_or_default(),
            date: latest.map(|r| r.period_end.to_string()).unwrap_or_default(),
        })?;
    }
    csv.flush()?;
    info!(path = %path.display(), committees = roster.len(), "Wrote committee summary");
    Ok(())
}
