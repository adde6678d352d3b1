use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::NormalizeError;

pub mod graham_value;

/// One line item's history: ISO period-end date -> reported value.
/// `None` is a reported gap. The importer writes gaps as bare `NaN` tokens,
/// which [`RawStatementBundle::from_json_str`] reads as `null`.
pub type LabelSeries = BTreeMap<String, Option<f64>>;

/// A statement group: free-form source label -> its history.
pub type StatementMap = BTreeMap<String, LabelSeries>;

/// Raw per-company input as written by the upstream importer.
///
/// Only the statement groups, market data and the two profile keys kept in
/// the company registry are decoded; the remaining profile keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatementBundle {
    #[serde(rename = "regularMarketPrice", default)]
    pub share_price: Option<f64>,
    #[serde(rename = "sharesOutstanding", default)]
    pub shares_issued: Option<i64>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(rename = "incomestmt", default)]
    pub income_statement: StatementMap,
    #[serde(rename = "balancesheet", default)]
    pub balance_sheet: StatementMap,
    /// Dividend payments keyed by payment date (flat, not label-keyed).
    /// Payments without an amount are dropped.
    #[serde(default, deserialize_with = "skip_missing_amounts")]
    pub dividends: BTreeMap<String, f64>,
}

impl RawStatementBundle {
    /// Decode a bundle from the importer's JSON document.
    pub fn from_json(company: &str, value: serde_json::Value) -> Result<Self, NormalizeError> {
        if !value.is_object() {
            return Err(NormalizeError::MalformedBundle {
                company: company.to_string(),
                reason: format!("expected a JSON object, found {}", json_kind(&value)),
            });
        }

        serde_json::from_value(value).map_err(|e| NormalizeError::MalformedBundle {
            company: company.to_string(),
            reason: e.to_string(),
        })
    }

    /// Decode a bundle straight from the importer's JSON text.
    ///
    /// Bare `NaN`, `Infinity` and `-Infinity` tokens are read as `null`.
    pub fn from_json_str(company: &str, text: &str) -> Result<Self, NormalizeError> {
        let value: serde_json::Value = serde_json::from_str(&replace_non_finite(text))
            .map_err(|e| NormalizeError::MalformedBundle {
                company: company.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_json(company, value)
    }
}

fn skip_missing_amounts<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let amounts = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
    Ok(amounts
        .into_iter()
        .filter_map(|(date, amount)| amount.map(|a| (date, a)))
        .collect())
}

/// Rewrite the non-finite literals the importer emits as `null`.
/// String contents are left untouched.
pub fn replace_non_finite(text: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !TOKENS.iter().any(|token| text.contains(token)) {
        return Cow::Borrowed(text);
    }

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        match TOKENS
            .iter()
            .find(|token| bytes[i..].starts_with(token.as_bytes()))
        {
            Some(token) => {
                out.push_str(&text[copied..i]);
                out.push_str("null");
                i += token.len();
                copied = i;
            }
            None => i += 1,
        }
    }

    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Canonical financial record for one company and one fiscal year.
///
/// Every field except `year` is `None` when no source value contributed to it.
/// `None` is never a stand-in for zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CanonicalYearRecord {
    pub year: i32,
    pub share_price: Option<f64>,
    pub sales: Option<f64>,
    pub shares_issued: Option<i64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub financial_debts: Option<f64>,
    pub equity: Option<f64>,
    pub intangible_assets: Option<f64>,
    pub net_income: Option<f64>,
    pub dividends: Option<f64>,
    pub eps: Option<f64>,
}

impl CanonicalYearRecord {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }
}

/// A registered company with a summary of its stored history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub country: Option<String>,
    /// Number of fiscal years stored.
    pub years: i64,
    /// Most recent write to any of its yearly records.
    pub last_update: Option<NaiveDateTime>,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub raw_data_path: String,
    pub worker_count: usize,
    pub debt_clause: graham_value::DebtClause,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let debt_clause = match std::env::var("GRAHAM_DEBT_CLAUSE") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("GRAHAM_DEBT_CLAUSE: {}", e))?,
            Err(_) => graham_value::DebtClause::default(),
        };

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/processed/financials.db".to_string()),
            raw_data_path: std::env::var("RAW_DATA_PATH")
                .unwrap_or_else(|_| "data/raw".to_string()),
            worker_count: std::env::var("WORKER_COUNT")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            debt_clause,
        })
    }
}
