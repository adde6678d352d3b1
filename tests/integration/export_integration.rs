//! CSV export of stored data

use graham_screen::{
    analysis::GrahamScreener,
    export::{export_financials_csv, export_report_csv},
};
use pretty_assertions::assert_eq;

use crate::common::{init_fresh_test_database, test_data};

#[tokio::test]
async fn test_export_stored_history() {
    let db = init_fresh_test_database().await.unwrap();
    let mut records = test_data::graham_company_records(2022, 2);
    records[0].dividends = None;
    db.manager.upsert_financials("SAN.PA", &records).await.unwrap();

    let stored = db.manager.get_financials("SAN.PA", None).await.unwrap();
    let mut reader = {
        let mut out = Vec::new();
        export_financials_csv(&stored, &mut out).unwrap();
        csv::Reader::from_reader(std::io::Cursor::new(out))
    };

    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.get(0), Some("year"));
    assert_eq!(headers.get(10), Some("dividends"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get(0), Some("2022"));
    assert_eq!(rows[0].get(10), Some(""));
    assert_eq!(rows[1].get(10), Some("1.0"));
}

#[test]
fn test_export_report_has_all_rules() {
    let records = test_data::graham_company_records(2004, 20);
    let report = GrahamScreener::default().evaluate(&records);

    let mut out = Vec::new();
    export_report_csv("TTE.PA", &report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 9);
    assert!(lines[1].starts_with("TTE.PA,Rule 1,true,"));
    assert!(lines[8].starts_with("TTE.PA,Bonus Rule,true,"));
}
