// Benjamin Graham Value Screening Models
// Rule thresholds, verdicts and reports for the multi-year screening engine

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the debt clause of the liquidity rule is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebtClause {
    /// `financial_debts <= current_assets - financial_debts`, as the rule is written.
    #[default]
    Literal,
    /// `financial_debts <= current_assets - current_liabilities`.
    WorkingCapital,
}

impl FromStr for DebtClause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "literal" => Ok(DebtClause::Literal),
            "working-capital" | "working_capital" => Ok(DebtClause::WorkingCapital),
            other => Err(format!(
                "unknown debt clause '{}' (expected 'literal' or 'working-capital')",
                other
            )),
        }
    }
}

/// Graham screening criteria based on "The Intelligent Investor" principles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    // Size
    pub min_average_sales: f64,
    pub sales_years: usize,

    // Financial health
    pub min_current_ratio: f64,
    pub debt_clause: DebtClause,

    // Earnings and dividend record
    pub earnings_years: usize,
    pub dividend_years: usize,

    // Growth
    pub eps_growth_years: usize,
    pub eps_growth_sample: usize,
    pub min_eps_growth_factor: f64,

    // Valuation
    pub pe_eps_years: usize,
    pub max_pe_ratio: f64,
    pub max_pb_ratio: f64,
    pub max_pe_pb_product: f64,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            min_average_sales: 100_000_000.0,
            sales_years: 2,
            min_current_ratio: 2.0,
            debt_clause: DebtClause::Literal,
            earnings_years: 10,
            dividend_years: 20,
            eps_growth_years: 10,
            eps_growth_sample: 3,
            min_eps_growth_factor: 1.33,
            pe_eps_years: 3,
            max_pe_ratio: 15.0,
            max_pb_ratio: 1.5,
            max_pe_pb_product: 22.5,
        }
    }
}

/// The eight screening rules, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrahamRule {
    #[serde(rename = "Rule 1")]
    SalesScale,
    #[serde(rename = "Rule 2")]
    Liquidity,
    #[serde(rename = "Rule 3")]
    EarningsStability,
    #[serde(rename = "Rule 4")]
    DividendContinuity,
    #[serde(rename = "Rule 5")]
    EpsGrowth,
    #[serde(rename = "Rule 6")]
    EarningsYield,
    #[serde(rename = "Rule 7")]
    TangibleBookValuation,
    #[serde(rename = "Bonus Rule")]
    CombinedMultiple,
}

impl GrahamRule {
    pub const ALL: [GrahamRule; 8] = [
        GrahamRule::SalesScale,
        GrahamRule::Liquidity,
        GrahamRule::EarningsStability,
        GrahamRule::DividendContinuity,
        GrahamRule::EpsGrowth,
        GrahamRule::EarningsYield,
        GrahamRule::TangibleBookValuation,
        GrahamRule::CombinedMultiple,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GrahamRule::SalesScale => "Rule 1",
            GrahamRule::Liquidity => "Rule 2",
            GrahamRule::EarningsStability => "Rule 3",
            GrahamRule::DividendContinuity => "Rule 4",
            GrahamRule::EpsGrowth => "Rule 5",
            GrahamRule::EarningsYield => "Rule 6",
            GrahamRule::TangibleBookValuation => "Rule 7",
            GrahamRule::CombinedMultiple => "Bonus Rule",
        }
    }
}

impl fmt::Display for GrahamRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single fiscal year's value inside a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: Option<f64>,
}

/// The numbers a verdict was computed from.
///
/// Ratios whose denominator is zero or negative are `f64::INFINITY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictValue {
    /// Mean of the present values in a window.
    Average { points: Vec<YearValue>, mean: Option<f64> },
    /// Latest-year liquidity inputs and the debt ceiling they imply.
    Liquidity {
        year: i32,
        current_assets: f64,
        current_liabilities: f64,
        financial_debts: f64,
        debt_limit: f64,
    },
    /// Every year inside a window.
    Series { points: Vec<YearValue> },
    /// Early vs. recent EPS means.
    Growth { first_mean: f64, last_mean: f64, required: f64 },
    /// A quotient and its operands; `denominator` is `None` when it was never reported.
    Ratio {
        numerator: f64,
        denominator: Option<f64>,
        ratio: f64,
    },
    /// PER × PBR.
    Product { per: f64, pbr: f64, product: f64 },
    /// Nothing could be computed.
    Unavailable,
}

impl fmt::Display for VerdictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictValue::Average { mean: Some(mean), .. } => write!(f, "{:.2}", mean),
            VerdictValue::Average { mean: None, .. } => f.write_str("n/a"),
            VerdictValue::Liquidity {
                current_assets,
                current_liabilities,
                financial_debts,
                ..
            } => write!(
                f,
                "CA={}, CL={}, FD={}",
                current_assets, current_liabilities, financial_debts
            ),
            VerdictValue::Series { points } => {
                let rendered: Vec<String> = points
                    .iter()
                    .map(|p| match p.value {
                        Some(v) => format!("{}: {}", p.year, v),
                        None => format!("{}: n/a", p.year),
                    })
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            VerdictValue::Growth {
                first_mean,
                last_mean,
                ..
            } => write!(f, "{:.2} → {:.2}", first_mean, last_mean),
            VerdictValue::Ratio {
                numerator,
                denominator,
                ratio,
            } => match denominator {
                Some(d) => write!(f, "{:.2} / {:.2} = {:.2}", numerator, d, ratio),
                None => write!(f, "{:.2} / n/a = {:.2}", numerator, ratio),
            },
            VerdictValue::Product { per, pbr, product } => {
                write!(f, "{:.2} × {:.2} = {:.2}", per, pbr, product)
            }
            VerdictValue::Unavailable => f.write_str("n/a"),
        }
    }
}

/// Outcome of one rule for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub passed: bool,
    pub description: String,
    pub value: VerdictValue,
}

impl RuleVerdict {
    pub fn new(passed: bool, description: impl Into<String>, value: VerdictValue) -> Self {
        Self {
            passed,
            description: description.into(),
            value,
        }
    }

    /// Failing verdict for a rule whose inputs are missing.
    pub fn unavailable(description: impl Into<String>) -> Self {
        Self::new(false, description, VerdictValue::Unavailable)
    }
}

/// All verdicts from one evaluation call, keyed and ordered by rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreeningReport {
    verdicts: BTreeMap<GrahamRule, RuleVerdict>,
}

impl ScreeningReport {
    pub fn insert(&mut self, rule: GrahamRule, verdict: RuleVerdict) {
        self.verdicts.insert(rule, verdict);
    }

    pub fn get(&self, rule: GrahamRule) -> Option<&RuleVerdict> {
        self.verdicts.get(&rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GrahamRule, &RuleVerdict)> {
        self.verdicts.iter()
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.verdicts.values().filter(|v| v.passed).count()
    }

    pub fn passes_all(&self) -> bool {
        !self.verdicts.is_empty() && self.verdicts.values().all(|v| v.passed)
    }
}
