//! Statement normalizer
//!
//! Turns a raw label-keyed statement bundle into one canonical record per
//! fiscal year. The income statement enumerates the years; every other field
//! is resolved independently through the alias table in [`aliases`].

pub mod aliases;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::NormalizeError;
use crate::models::{CanonicalYearRecord, RawStatementBundle, StatementMap};
use aliases::{aliases_for, Aggregation, AliasSet, CanonicalField, FieldAliases, Statement};

/// Result of resolving one field for one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    Value(f64),
    Zero,
    Absent,
}

impl Resolved {
    fn from_value(value: f64) -> Self {
        if value == 0.0 {
            Resolved::Zero
        } else {
            Resolved::Value(value)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Resolved::Absent)
    }

    pub fn into_option(self) -> Option<f64> {
        match self {
            Resolved::Value(v) => Some(v),
            Resolved::Zero => Some(0.0),
            Resolved::Absent => None,
        }
    }
}

/// Normalize a decoded bundle into canonical records, ascending by year.
pub fn normalize(
    company: &str,
    bundle: &RawStatementBundle,
) -> Result<Vec<CanonicalYearRecord>, NormalizeError> {
    let years = fiscal_years(company, &bundle.income_statement)?;

    let records: Vec<CanonicalYearRecord> = years
        .into_iter()
        .map(|year| build_record(company, bundle, year))
        .collect();

    debug!("Normalized {} fiscal years for {}", records.len(), company);
    Ok(records)
}

/// Decode and normalize the importer's JSON document in one step.
pub fn normalize_json(
    company: &str,
    value: serde_json::Value,
) -> Result<Vec<CanonicalYearRecord>, NormalizeError> {
    let bundle = RawStatementBundle::from_json(company, value)?;
    normalize(company, &bundle)
}

/// Every fiscal year that appears in any income-statement series.
pub fn fiscal_years(company: &str, income: &StatementMap) -> Result<Vec<i32>, NormalizeError> {
    let mut years = BTreeSet::new();
    for series in income.values() {
        for date in series.keys() {
            let year = year_of(date).ok_or_else(|| NormalizeError::MalformedDate {
                company: company.to_string(),
                date: date.clone(),
            })?;
            years.insert(year);
        }
    }
    Ok(years.into_iter().collect())
}

/// Fiscal year of an ISO date string (`"2023-12-31"` -> 2023).
pub fn year_of(date: &str) -> Option<i32> {
    let prefix = date.split('-').next()?;
    if prefix.len() != 4 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

fn build_record(company: &str, bundle: &RawStatementBundle, year: i32) -> CanonicalYearRecord {
    let field = |field: CanonicalField| -> Option<f64> {
        let resolved = match aliases_for(field) {
            Some(rule) => resolve_field(bundle, rule, year),
            None => Resolved::Absent,
        };
        if resolved.is_absent() {
            debug!("{}: no source value for {} in {}", company, field.name(), year);
        }
        resolved.into_option()
    };

    CanonicalYearRecord {
        year,
        share_price: bundle.share_price,
        sales: field(CanonicalField::Sales),
        shares_issued: bundle.shares_issued,
        current_assets: field(CanonicalField::CurrentAssets),
        current_liabilities: field(CanonicalField::CurrentLiabilities),
        financial_debts: field(CanonicalField::FinancialDebts),
        equity: field(CanonicalField::Equity),
        intangible_assets: field(CanonicalField::IntangibleAssets),
        net_income: field(CanonicalField::NetIncome),
        dividends: sum_dividends(&bundle.dividends, year),
        eps: field(CanonicalField::Eps),
    }
}

/// Walk a field's alias chain; the first set that yields anything wins.
pub fn resolve_field(bundle: &RawStatementBundle, rule: &FieldAliases, year: i32) -> Resolved {
    let statement = match rule.statement {
        Statement::Income => &bundle.income_statement,
        Statement::Balance => &bundle.balance_sheet,
    };

    rule.chain
        .iter()
        .map(|set| resolve_set(statement, set, year))
        .find(|resolved| !resolved.is_absent())
        .unwrap_or(Resolved::Absent)
}

fn resolve_set(statement: &StatementMap, set: &AliasSet, year: i32) -> Resolved {
    match set.aggregation {
        Aggregation::Sum => {
            let matched: Vec<f64> = set
                .labels
                .iter()
                .flat_map(|label| year_values(statement, label, year))
                .collect();
            if matched.is_empty() {
                Resolved::Absent
            } else {
                Resolved::from_value(matched.iter().sum::<f64>())
            }
        }
        Aggregation::FirstMatch => set
            .labels
            .iter()
            .find_map(|label| year_values(statement, label, year).next())
            .map(Resolved::from_value)
            .unwrap_or(Resolved::Absent),
    }
}

/// Reported values of `label` whose period ends in `year`.
fn year_values<'a>(
    statement: &'a StatementMap,
    label: &str,
    year: i32,
) -> impl Iterator<Item = f64> + 'a {
    statement
        .get(label)
        .into_iter()
        .flat_map(|series| series.iter())
        .filter(move |(date, _)| year_of(date) == Some(year))
        .filter_map(|(_, value)| *value)
}

/// Total dividends paid during `year`; a zero total is reported as absent.
pub fn sum_dividends(dividends: &BTreeMap<String, f64>, year: i32) -> Option<f64> {
    let total: f64 = dividends
        .iter()
        .filter(|(date, _)| year_of(date) == Some(year))
        .map(|(_, amount)| amount)
        .sum();

    if total == 0.0 {
        None
    } else {
        Some(total)
    }
}
