// Benjamin Graham Value Screening Engine
// Multi-year rule evaluation over one company's canonical yearly records

use tracing::debug;

use crate::models::graham_value::{
    DebtClause, GrahamRule, RuleVerdict, ScreeningCriteria, ScreeningReport, VerdictValue,
    YearValue,
};
use crate::models::CanonicalYearRecord;

/// Records of one company ordered ascending by year.
pub struct YearSeries<'a> {
    records: Vec<&'a CanonicalYearRecord>,
}

impl<'a> YearSeries<'a> {
    pub fn new(records: &'a [CanonicalYearRecord]) -> Self {
        let mut records: Vec<&CanonicalYearRecord> = records.iter().collect();
        records.sort_by_key(|r| r.year);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&'a CanonicalYearRecord> {
        self.records.last().copied()
    }

    /// The `n` records with the largest years (all of them if fewer exist).
    pub fn last_n(&self, n: usize) -> &[&'a CanonicalYearRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// The `n` records with the smallest years.
    pub fn first_n(&self, n: usize) -> &[&'a CanonicalYearRecord] {
        let end = n.min(self.records.len());
        &self.records[..end]
    }
}

/// A ratio computed for the valuation rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratio {
    pub numerator: f64,
    pub denominator: Option<f64>,
    pub ratio: f64,
}

impl Ratio {
    /// Price over mean EPS. Absent and zero means give an infinite ratio;
    /// a negative mean divides through.
    fn price_earnings(price: f64, mean_eps: Option<f64>) -> Self {
        let ratio = match mean_eps {
            Some(eps) if eps != 0.0 => price / eps,
            _ => f64::INFINITY,
        };
        Self {
            numerator: price,
            denominator: mean_eps,
            ratio,
        }
    }

    /// Market cap over tangible equity. Zero and negative equity give an
    /// infinite ratio.
    fn price_book(market_cap: f64, tangible_equity: f64) -> Self {
        let ratio = if tangible_equity > 0.0 {
            market_cap / tangible_equity
        } else {
            f64::INFINITY
        };
        Self {
            numerator: market_cap,
            denominator: Some(tangible_equity),
            ratio,
        }
    }

    fn value(&self) -> VerdictValue {
        VerdictValue::Ratio {
            numerator: self.numerator,
            denominator: self.denominator,
            ratio: self.ratio,
        }
    }
}

/// PER and PBR inputs shared by rules 6, 7 and the bonus rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// Latest price over the mean of recent EPS, or why it could not be formed.
    pub per: Result<Ratio, String>,
    /// Market cap over tangible book value, or why it could not be formed.
    pub pbr: Result<Ratio, String>,
}

pub struct GrahamScreener {
    criteria: ScreeningCriteria,
}

impl Default for GrahamScreener {
    fn default() -> Self {
        Self::new(ScreeningCriteria::default())
    }
}

impl GrahamScreener {
    pub fn new(criteria: ScreeningCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &ScreeningCriteria {
        &self.criteria
    }

    /// Evaluate every rule against one company's records.
    ///
    /// All eight verdicts are always present; a rule that lacks inputs fails
    /// with a description of what is missing.
    pub fn evaluate(&self, records: &[CanonicalYearRecord]) -> ScreeningReport {
        let series = YearSeries::new(records);
        let valuation = self.valuation(&series);

        let mut report = ScreeningReport::default();
        report.insert(GrahamRule::SalesScale, self.check_sales(&series));
        report.insert(GrahamRule::Liquidity, self.check_current_ratio(&series));
        report.insert(GrahamRule::EarningsStability, self.check_positive_income(&series));
        report.insert(GrahamRule::DividendContinuity, self.check_dividend_history(&series));
        report.insert(GrahamRule::EpsGrowth, self.check_eps_growth(&series));
        report.insert(GrahamRule::EarningsYield, self.check_eps_price_ratio(&valuation));
        report.insert(GrahamRule::TangibleBookValuation, self.check_valuation_ratio(&valuation));
        report.insert(GrahamRule::CombinedMultiple, self.check_bonus_rule(&valuation));

        debug!(
            "Screened {} years: {}/{} rules passed",
            series.len(),
            report.passed_count(),
            report.len()
        );
        report
    }

    /// Compute the shared PER/PBR intermediates once per evaluation.
    pub fn valuation(&self, series: &YearSeries<'_>) -> Valuation {
        let Some(latest) = series.latest() else {
            let reason = "No financial records".to_string();
            return Valuation {
                per: Err(reason.clone()),
                pbr: Err(reason),
            };
        };

        let per = match latest.share_price {
            Some(price) => {
                let eps: Vec<f64> = series
                    .last_n(self.criteria.pe_eps_years)
                    .iter()
                    .filter_map(|r| r.eps)
                    .collect();
                Ok(Ratio::price_earnings(price, mean(&eps)))
            }
            None => Err(format!("No share price for {}", latest.year)),
        };

        let missing = missing_fields(&[
            ("shares_issued", latest.shares_issued.is_none()),
            ("share_price", latest.share_price.is_none()),
            ("equity", latest.equity.is_none()),
            ("intangible_assets", latest.intangible_assets.is_none()),
        ]);
        let pbr = match (
            latest.shares_issued,
            latest.share_price,
            latest.equity,
            latest.intangible_assets,
        ) {
            (Some(shares), Some(price), Some(equity), Some(intangibles)) => {
                Ok(Ratio::price_book(shares as f64 * price, equity - intangibles))
            }
            _ => Err(format!("Missing {} for {}", missing, latest.year)),
        };

        Valuation { per, pbr }
    }

    // Rule 1: mean sales over the most recent years
    fn check_sales(&self, series: &YearSeries<'_>) -> RuleVerdict {
        let years = self.criteria.sales_years;
        let window = series.last_n(years);
        let description = format!(
            "Average sales in last {} years ≥ {}{}",
            years,
            compact_amount(self.criteria.min_average_sales),
            shortfall_note(window.len(), years)
        );

        if window.is_empty() {
            return RuleVerdict::unavailable(format!("{}: no financial records", description));
        }

        let points = year_values(window, |r| r.sales);
        let present: Vec<f64> = points.iter().filter_map(|p| p.value).collect();
        let mean = mean(&present);

        match mean {
            Some(avg) => RuleVerdict::new(
                avg >= self.criteria.min_average_sales,
                description,
                VerdictValue::Average { points, mean },
            ),
            None => RuleVerdict::new(
                false,
                format!("{}: no sales reported", description),
                VerdictValue::Average { points, mean },
            ),
        }
    }

    // Rule 2: current ratio and debt ceiling on the latest year
    fn check_current_ratio(&self, series: &YearSeries<'_>) -> RuleVerdict {
        let clause = match self.criteria.debt_clause {
            DebtClause::Literal => "financial debt ≤ (CA - FD)",
            DebtClause::WorkingCapital => "financial debt ≤ (CA - CL)",
        };
        let description = format!(
            "Current assets ≥ {} × current liabilities and {}",
            self.criteria.min_current_ratio, clause
        );

        let Some(latest) = series.latest() else {
            return RuleVerdict::unavailable(format!("{}: no financial records", description));
        };

        let (ca, cl, fd) = match (
            latest.current_assets,
            latest.current_liabilities,
            latest.financial_debts,
        ) {
            (Some(ca), Some(cl), Some(fd)) => (ca, cl, fd),
            _ => {
                let missing = missing_fields(&[
                    ("current_assets", latest.current_assets.is_none()),
                    ("current_liabilities", latest.current_liabilities.is_none()),
                    ("financial_debts", latest.financial_debts.is_none()),
                ]);
                return RuleVerdict::unavailable(format!(
                    "{}: missing {} for {}",
                    description, missing, latest.year
                ));
            }
        };

        let debt_limit = match self.criteria.debt_clause {
            DebtClause::Literal => ca - fd,
            DebtClause::WorkingCapital => ca - cl,
        };
        let passed = ca >= self.criteria.min_current_ratio * cl && fd <= debt_limit;

        RuleVerdict::new(
            passed,
            description,
            VerdictValue::Liquidity {
                year: latest.year,
                current_assets: ca,
                current_liabilities: cl,
                financial_debts: fd,
                debt_limit,
            },
        )
    }

    // Rule 3: net income positive every year of the window
    fn check_positive_income(&self, series: &YearSeries<'_>) -> RuleVerdict {
        let years = self.criteria.earnings_years;
        self.check_all_positive(
            series.last_n(years),
            years,
            &format!("Positive net income for {} consecutive years", years),
            |r| r.net_income,
        )
    }

    // Rule 4: dividends paid every year of the window
    fn check_dividend_history(&self, series: &YearSeries<'_>) -> RuleVerdict {
        let years = self.criteria.dividend_years;
        self.check_all_positive(
            series.last_n(years),
            years,
            &format!("Uninterrupted dividends for {} years", years),
            |r| r.dividends,
        )
    }

    /// A year without a value fails the rule; it cannot back a track-record claim.
    fn check_all_positive(
        &self,
        window: &[&CanonicalYearRecord],
        years: usize,
        base: &str,
        select: impl Fn(&CanonicalYearRecord) -> Option<f64>,
    ) -> RuleVerdict {
        let mut description = format!("{}{}", base, shortfall_note(window.len(), years));
        if window.is_empty() {
            return RuleVerdict::unavailable(format!("{}: no financial records", description));
        }

        let points = year_values(window, select);
        let missing: Vec<String> = points
            .iter()
            .filter(|p| p.value.is_none())
            .map(|p| p.year.to_string())
            .collect();
        if !missing.is_empty() {
            description.push_str(&format!(": no data for {}", missing.join(", ")));
        }

        let passed = points.iter().all(|p| matches!(p.value, Some(v) if v > 0.0));
        RuleVerdict::new(passed, description, VerdictValue::Series { points })
    }

    // Rule 5: early vs. recent EPS means over a long enough history
    fn check_eps_growth(&self, series: &YearSeries<'_>) -> RuleVerdict {
        let required_years = self.criteria.eps_growth_years;
        let sample = self.criteria.eps_growth_sample;
        let growth_pct = ((self.criteria.min_eps_growth_factor - 1.0) * 100.0).round();
        let description = format!(
            "EPS increased by at least {}% over {} years",
            growth_pct, required_years
        );

        if series.len() < required_years {
            return RuleVerdict::unavailable(format!(
                "Insufficient data: {} of {} years of EPS history",
                series.len(),
                required_years
            ));
        }

        let first: Vec<f64> = series.first_n(sample).iter().filter_map(|r| r.eps).collect();
        let last: Vec<f64> = series.last_n(sample).iter().filter_map(|r| r.eps).collect();

        match (mean(&first), mean(&last)) {
            (Some(first_mean), Some(last_mean)) => {
                let required = first_mean * self.criteria.min_eps_growth_factor;
                RuleVerdict::new(
                    last_mean >= required,
                    description,
                    VerdictValue::Growth {
                        first_mean,
                        last_mean,
                        required,
                    },
                )
            }
            (first_mean, _) => {
                let side = if first_mean.is_none() { "first" } else { "last" };
                RuleVerdict::unavailable(format!(
                    "{}: no EPS reported in the {} {} years",
                    description, side, sample
                ))
            }
        }
    }

    // Rule 6: price over mean recent EPS
    fn check_eps_price_ratio(&self, valuation: &Valuation) -> RuleVerdict {
        let description = format!(
            "P/E ratio ({}-year avg) ≤ {}",
            self.criteria.pe_eps_years, self.criteria.max_pe_ratio
        );

        match &valuation.per {
            Ok(per) => {
                let description = match per.denominator {
                    None => format!("{}: no EPS reported, ratio treated as infinite", description),
                    Some(eps) if eps == 0.0 => {
                        format!("{}: mean EPS is zero, ratio treated as infinite", description)
                    }
                    Some(eps) if eps < 0.0 => format!("{}: mean EPS is negative", description),
                    Some(_) => description,
                };
                RuleVerdict::new(per.ratio <= self.criteria.max_pe_ratio, description, per.value())
            }
            Err(reason) => RuleVerdict::unavailable(format!("{}: {}", description, reason)),
        }
    }

    // Rule 7: market cap over tangible book value
    fn check_valuation_ratio(&self, valuation: &Valuation) -> RuleVerdict {
        let description = format!("Market cap / tangible equity ≤ {}", self.criteria.max_pb_ratio);

        match &valuation.pbr {
            Ok(pbr) => RuleVerdict::new(
                pbr.ratio <= self.criteria.max_pb_ratio,
                description,
                pbr.value(),
            ),
            Err(reason) => RuleVerdict::unavailable(format!("{}: {}", description, reason)),
        }
    }

    // Bonus rule: PER × PBR from the same intermediates as rules 6 and 7
    fn check_bonus_rule(&self, valuation: &Valuation) -> RuleVerdict {
        let description = format!("PER × PBR ≤ {}", self.criteria.max_pe_pb_product);

        match (&valuation.per, &valuation.pbr) {
            (Ok(per), Ok(pbr)) => {
                let mut product = per.ratio * pbr.ratio;
                if product.is_nan() {
                    product = f64::INFINITY;
                }
                RuleVerdict::new(
                    product <= self.criteria.max_pe_pb_product,
                    description,
                    VerdictValue::Product {
                        per: per.ratio,
                        pbr: pbr.ratio,
                        product,
                    },
                )
            }
            (Err(reason), _) | (_, Err(reason)) => {
                RuleVerdict::unavailable(format!("{}: {}", description, reason))
            }
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn year_values(
    window: &[&CanonicalYearRecord],
    select: impl Fn(&CanonicalYearRecord) -> Option<f64>,
) -> Vec<YearValue> {
    window
        .iter()
        .map(|r| YearValue {
            year: r.year,
            value: select(*r),
        })
        .collect()
}

fn missing_fields(fields: &[(&str, bool)]) -> String {
    fields
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn shortfall_note(available: usize, required: usize) -> String {
    if available < required {
        format!(" (only {} of {} years available)", available, required)
    } else {
        String::new()
    }
}

fn compact_amount(amount: f64) -> String {
    if amount >= 1e9 {
        format!("{}B", amount / 1e9)
    } else if amount >= 1e6 {
        format!("{}M", amount / 1e6)
    } else {
        format!("{}", amount)
    }
}
