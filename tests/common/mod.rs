//! Common test utilities and helpers


pub use database::{init_fresh_test_database, TestDatabase};

/// Test data utilities
pub mod test_data {
    use graham_screen::models::CanonicalYearRecord;
    use serde_json::{json, Map, Value};

    /// Per-year EPS of the passing fixture company.
    pub fn fixture_eps(index: usize) -> f64 {
        5.0 + 0.5 * index as f64
    }

    /// Records for a company that passes every rule when `years >= 20`.
    pub fn graham_company_records(start_year: i32, years: usize) -> Vec<CanonicalYearRecord> {
        (0..years)
            .map(|i| CanonicalYearRecord {
                year: start_year + i as i32,
                share_price: Some(30.0),
                sales: Some(200_000_000.0),
                shares_issued: Some(1_000_000),
                current_assets: Some(80_000_000.0),
                current_liabilities: Some(30_000_000.0),
                financial_debts: Some(20_000_000.0),
                equity: Some(150_000_000.0),
                intangible_assets: Some(10_000_000.0),
                net_income: Some(10_000_000.0),
                dividends: Some(1.0),
                eps: Some(fixture_eps(i)),
            })
            .collect()
    }

    fn series(start_year: i32, years: usize, value: impl Fn(usize) -> f64) -> Value {
        let mut map = Map::new();
        for i in 0..years {
            map.insert(format!("{}-12-31", start_year + i as i32), json!(value(i)));
        }
        Value::Object(map)
    }

    /// Raw bundle that normalizes to [`graham_company_records`].
    pub fn graham_company_bundle(start_year: i32, years: usize) -> Value {
        let mut dividends = Map::new();
        for i in 0..years {
            let year = start_year + i as i32;
            dividends.insert(format!("{}-03-15", year), json!(0.4));
            dividends.insert(format!("{}-09-15", year), json!(0.6));
        }

        json!({
            "country": "France",
            "industry": "Utilities",
            "regularMarketPrice": 30.0,
            "sharesOutstanding": 1_000_000,
            "incomestmt": {
                "Operating Revenue": series(start_year, years, |_| 200_000_000.0),
                "Net Income Continuous Operations": series(start_year, years, |_| 10_000_000.0),
                "Basic EPS": series(start_year, years, fixture_eps)
            },
            "balancesheet": {
                "Current Assets": series(start_year, years, |_| 80_000_000.0),
                "Current Liabilities": series(start_year, years, |_| 30_000_000.0),
                "Long Term Debt And Capital Lease Obligation": series(start_year, years, |_| 20_000_000.0),
                "Stockholders Equity": series(start_year, years, |_| 150_000_000.0),
                "Goodwill And Other Intangible Assets": series(start_year, years, |_| 10_000_000.0)
            },
            "dividends": Value::Object(dividends)
        })
    }

    /// Single-year bundle in the importer's layout, profile keys included.
    pub fn test_corp_bundle() -> Value {
        json!({
            "country": "France",
            "phone": "33 7 85 44 11 22",
            "industry": "Retail",
            "sector": "Consulting",
            "fullTimeEmployees": "2990",
            "regularMarketPrice": 52.5,
            "sharesOutstanding": 1000000000,
            "incomestmt": {
                "Operating Revenue": { "2023-12-31": 100000000.0 },
                "Net Income Continuous Operations": { "2023-12-31": 9000000.0 },
                "Basic EPS": { "2023-12-31": 1.2 }
            },
            "balancesheet": {
                "Current Assets": { "2023-12-31": 5000000.0 },
                "Other Current Assets": { "2023-12-31": 1000000.0 },
                "Current Liabilities": { "2023-12-31": 3000000.0 },
                "Other Current Liabilities": { "2023-12-31": 200000.0 },
                "Stockholders Equity": { "2023-12-31": 15000000.0 },
                "Derivative Product Liabilities": { "2023-12-31": 800000.0 },
                "Long Term Debt And Capital Lease Obligation": { "2023-12-31": 700000.0 },
                "Goodwill And Other Intangible Assets": { "2023-12-31": 250000.0 }
            },
            "dividends": {
                "2023-01-10": 0.5,
                "2023-04-15": 0.6,
                "2022-11-10": 0.4
            }
        })
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            // Another test harness may already have installed a subscriber.
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("graham_screen=debug,test=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
