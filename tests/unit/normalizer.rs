//! Normalizer tests over importer-shaped bundles

use assert_matches::assert_matches;
use graham_screen::{
    error::NormalizeError,
    models::RawStatementBundle,
    normalizer::{normalize, normalize_json},
};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{logging, test_data};

#[test]
fn test_extract_single_year_bundle() {
    logging::init_test_logging();
    logging::log_test_step("Normalizing a one-year bundle");

    let records = normalize_json("TestCorp", test_data::test_corp_bundle()).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.year, 2023);
    assert_eq!(record.share_price, Some(52.5));
    assert_eq!(record.sales, Some(100_000_000.0));
    assert_eq!(record.shares_issued, Some(1_000_000_000));
    assert_eq!(record.current_assets, Some(6_000_000.0));
    assert_eq!(record.current_liabilities, Some(3_200_000.0));
    assert_eq!(record.financial_debts, Some(1_500_000.0));
    assert_eq!(record.equity, Some(15_000_000.0));
    assert_eq!(record.intangible_assets, Some(250_000.0));
    assert_eq!(record.net_income, Some(9_000_000.0));
    assert_eq!(record.eps, Some(1.2));

    let dividends = record.dividends.unwrap();
    assert!((dividends - 1.1).abs() < 1e-9, "dividends were {}", dividends);
}

#[test]
fn test_missing_labels_stay_absent() {
    let minimal = json!({
        "regularMarketPrice": 40,
        "incomestmt": { "Operating Revenue": { "2023-12-31": 5000 } },
        "balancesheet": {},
        "dividends": {}
    });

    let records = normalize_json("MiniCorp", minimal).unwrap();
    let record = &records[0];
    logging::log_test_data("MiniCorp record", record);

    assert_eq!(record.share_price, Some(40.0));
    assert_eq!(record.sales, Some(5000.0));
    assert_eq!(record.net_income, None);
    assert_eq!(record.financial_debts, None);
    assert_eq!(record.dividends, None);
    assert_eq!(record.shares_issued, None);
}

#[test]
fn test_reported_zero_is_not_absent() {
    let raw = json!({
        "incomestmt": {
            "Net Income Continuous Operations": { "2023-12-31": 0.0 },
            "Basic EPS": { "2023-12-31": null }
        },
        "balancesheet": {
            "Goodwill And Other Intangible Assets": { "2023-12-31": 0.0 }
        }
    });

    let records = normalize_json("ZeroCorp", raw).unwrap();
    assert_eq!(records[0].net_income, Some(0.0));
    assert_eq!(records[0].intangible_assets, Some(0.0));
    assert_eq!(records[0].eps, None);
}

#[test]
fn test_null_cells_do_not_contribute_to_sums() {
    let raw = json!({
        "incomestmt": { "Basic EPS": { "2023-12-31": 1.0, "2022-12-31": 0.9 } },
        "balancesheet": {
            "Current Assets": { "2023-12-31": null, "2022-12-31": null },
            "Other Current Assets": { "2023-12-31": 1000.0, "2022-12-31": null }
        }
    });

    let records = normalize_json("GapCorp", raw).unwrap();
    let by_year: Vec<_> = records.iter().map(|r| (r.year, r.current_assets)).collect();
    assert_eq!(by_year, vec![(2022, None), (2023, Some(1000.0))]);
}

#[test]
fn test_financial_debts_alias_chain() {
    let cases = [
        (
            json!({ "Derivative Product Liabilities": { "2023-12-31": 800.0 } }),
            Some(800.0),
        ),
        (
            json!({ "Long Term Debt And Capital Lease Obligation": { "2023-12-31": 700.0 } }),
            Some(700.0),
        ),
        (
            json!({
                "Derivative Product Liabilities": { "2023-12-31": 800.0 },
                "Long Term Debt And Capital Lease Obligation": { "2023-12-31": 700.0 }
            }),
            Some(1500.0),
        ),
        (json!({ "Total Debt": { "2023-12-31": 900.0 } }), None),
    ];

    for (balance, expected) in cases {
        let raw = json!({
            "incomestmt": { "Basic EPS": { "2023-12-31": 1.0 } },
            "balancesheet": balance
        });
        let records = normalize_json("DebtCorp", raw).unwrap();
        assert_eq!(records[0].financial_debts, expected);
    }
}

#[test]
fn test_sales_prefers_operating_revenue() {
    let raw = json!({
        "incomestmt": {
            "Operating Revenue": { "2023-12-31": 90.0 },
            "Total Revenue": { "2023-12-31": 95.0, "2022-12-31": 85.0 }
        }
    });

    let records = normalize_json("RevCorp", raw).unwrap();
    let sales: Vec<_> = records.iter().map(|r| (r.year, r.sales)).collect();
    assert_eq!(sales, vec![(2022, Some(85.0)), (2023, Some(90.0))]);
}

#[test]
fn test_years_are_union_of_income_labels() {
    let raw = json!({
        "incomestmt": {
            "Basic EPS": { "2023-12-31": 1.0, "2021-12-31": 0.8 },
            "Operating Revenue": { "2022-12-31": 100.0 }
        },
        "balancesheet": {
            "Current Assets": { "2019-12-31": 10.0 }
        }
    });

    let records = normalize_json("SpanCorp", raw).unwrap();
    let years: Vec<i32> = records.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2021, 2022, 2023]);
    assert_eq!(records[1].eps, None);
    assert_eq!(records[1].sales, Some(100.0));
}

#[test]
fn test_same_bundle_normalizes_identically() {
    let bundle = RawStatementBundle::from_json("TestCorp", test_data::test_corp_bundle()).unwrap();
    assert_eq!(
        normalize("TestCorp", &bundle).unwrap(),
        normalize("TestCorp", &bundle).unwrap()
    );
}

#[test]
fn test_malformed_bundles() {
    let err = normalize_json("BadCorp", json!("not a bundle")).unwrap_err();
    assert_matches!(err, NormalizeError::MalformedBundle { ref company, .. } if company == "BadCorp");

    let err = normalize_json(
        "BadCorp",
        json!({ "incomestmt": { "Basic EPS": { "Q4": 1.0 } } }),
    )
    .unwrap_err();
    assert_matches!(err, NormalizeError::MalformedDate { ref date, .. } if date == "Q4");
}
