use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;

use crate::models::{graham_value::ScreeningReport, CanonicalYearRecord};

pub const FINANCIAL_COLUMNS: [&str; 12] = [
    "year",
    "share_price",
    "sales",
    "shares_issued",
    "current_assets",
    "current_liabilities",
    "financial_debts",
    "equity",
    "intangible_assets",
    "net_income",
    "dividends",
    "eps",
];

pub const REPORT_COLUMNS: [&str; 5] = ["company", "rule", "passed", "description", "value"];

#[derive(Serialize)]
struct ReportRow<'a> {
    company: &'a str,
    rule: &'a str,
    passed: bool,
    description: &'a str,
    value: String,
}

/// Write canonical records as CSV. Absent fields become empty cells.
pub fn export_financials_csv<W: Write>(records: &[CanonicalYearRecord], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(FINANCIAL_COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one row per rule verdict.
pub fn export_report_csv<W: Write>(company: &str, report: &ScreeningReport, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(REPORT_COLUMNS)?;
    for (rule, verdict) in report.iter() {
        wtr.serialize(ReportRow {
            company,
            rule: rule.label(),
            passed: verdict.passed,
            description: &verdict.description,
            value: verdict.value.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
