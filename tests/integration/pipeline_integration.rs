//! Batch ingestion over a directory of raw bundles

use std::sync::Arc;

use anyhow::{bail, Result};
use graham_screen::{
    models::RawStatementBundle,
    pipeline::{run_batch, run_batch_with_progress, BatchConfig, BatchStatus},
    source::{JsonDirectorySource, StatementSource},
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::common::{init_fresh_test_database, logging, test_data};

fn write_bundle(dir: &TempDir, ticker: &str, contents: &str) {
    std::fs::write(dir.path().join(format!("{}.json", ticker)), contents).unwrap();
}

fn raw_directory() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let good = test_data::graham_company_bundle(2004, 20).to_string();
    write_bundle(&dir, "AI.PA", &good);
    write_bundle(&dir, "OR.PA", &good);
    write_bundle(&dir, "TestCorp", &test_data::test_corp_bundle().to_string());
    write_bundle(&dir, "BROKEN", "[1, 2, 3]");
    dir
}

#[tokio::test]
async fn test_batch_isolates_failing_company() {
    logging::init_test_logging();
    logging::log_test_step("Running a batch with one malformed bundle");

    let raw = raw_directory();
    let db = init_fresh_test_database().await.unwrap();
    let database = Arc::new(db.manager.clone());

    let result = run_batch(
        Arc::new(JsonDirectorySource::new(raw.path())),
        Arc::clone(&database),
        BatchConfig {
            worker_count: 3,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    logging::log_test_data("Batch failures", &result.failures);

    assert_eq!(result.total, 4);
    assert_eq!(result.processed, 3);
    assert_eq!(result.failed, 1);
    assert!(result.failures.contains_key("BROKEN"));
    assert_eq!(result.total_records, 41);

    assert!(result.reports["AI.PA"].passes_all());
    assert_eq!(result.reports["AI.PA"], result.reports["OR.PA"]);
    assert_eq!(result.reports["TestCorp"].len(), 8);

    let stored = database.get_financials("OR.PA", None).await.unwrap();
    assert_eq!(stored, test_data::graham_company_records(2004, 20));
    assert!(database.get_financials("BROKEN", None).await.unwrap().is_empty());
}

/// Source that panics on one ticker and has no data for the others.
struct PanickingSource;

#[async_trait::async_trait]
impl StatementSource for PanickingSource {
    async fn list_companies(&self) -> Result<Vec<String>> {
        Ok(vec!["AI.PA".to_string(), "PANIC".to_string(), "OR.PA".to_string()])
    }

    async fn load_bundle(&self, company: &str) -> Result<RawStatementBundle> {
        if company == "PANIC" {
            panic!("source blew up on {}", company);
        }
        bail!("no data for {}", company)
    }
}

#[tokio::test]
async fn test_panicking_worker_keeps_batch_result() {
    let db = init_fresh_test_database().await.unwrap();

    let result = run_batch(
        Arc::new(PanickingSource),
        Arc::new(db.manager.clone()),
        BatchConfig {
            worker_count: 2,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // The surviving worker drains the queue after the other one dies
    assert_eq!(result.total, 3);
    assert_eq!(result.processed, 0);
    assert_eq!(result.failed, 2);
    assert!(result.failures.contains_key("AI.PA"));
    assert!(result.failures.contains_key("OR.PA"));
}

#[tokio::test]
async fn test_nan_bundle_is_ingested() {
    // The importer writes missing cells as a bare NaN token
    let mut bundle = test_data::graham_company_bundle(2004, 20);
    bundle["incomestmt"]["Basic EPS"]["2004-12-31"] = serde_json::json!("gap");
    let text = bundle.to_string().replace(r#""gap""#, "NaN");

    let raw = tempfile::tempdir().unwrap();
    write_bundle(&raw, "TTE.PA", &text);
    let db = init_fresh_test_database().await.unwrap();
    let database = Arc::new(db.manager.clone());

    let result = run_batch(
        Arc::new(JsonDirectorySource::new(raw.path())),
        Arc::clone(&database),
        BatchConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.failed, 0, "{:?}", result.failures);
    assert_eq!(result.processed, 1);

    let mut expected = test_data::graham_company_records(2004, 20);
    expected[0].eps = None;
    assert_eq!(database.get_financials("TTE.PA", None).await.unwrap(), expected);
}

#[tokio::test]
async fn test_batch_registers_profile_fields() {
    let raw = raw_directory();
    let db = init_fresh_test_database().await.unwrap();
    let database = Arc::new(db.manager.clone());

    run_batch(
        Arc::new(JsonDirectorySource::new(raw.path())),
        Arc::clone(&database),
        BatchConfig {
            companies: vec!["TestCorp".to_string()],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let companies = database.list_companies().await.unwrap();
    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].name, "TestCorp");
    assert_eq!(companies[0].industry.as_deref(), Some("Retail"));
}

#[tokio::test]
async fn test_missing_ticker_counts_as_failure() {
    let raw = raw_directory();
    let db = init_fresh_test_database().await.unwrap();

    let result = run_batch(
        Arc::new(JsonDirectorySource::new(raw.path())),
        Arc::new(db.manager.clone()),
        BatchConfig {
            worker_count: 1,
            companies: vec!["AI.PA".to_string(), "NOPE".to_string()],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.processed, 1);
    assert_eq!(result.failed, 1);
    assert!(result.failures["NOPE"].contains("NOPE.json"));
}

#[tokio::test]
async fn test_progress_is_published() {
    let raw = raw_directory();
    let db = init_fresh_test_database().await.unwrap();
    let (sender, mut receiver) = tokio::sync::broadcast::channel(64);

    let result = run_batch_with_progress(
        Arc::new(JsonDirectorySource::new(raw.path())),
        Arc::new(db.manager.clone()),
        BatchConfig {
            max_companies: Some(2),
            ..Default::default()
        },
        Some(sender),
    )
    .await
    .unwrap();
    assert_eq!(result.total, 2);

    // Bundles are listed in name order, so the batch covers AI.PA and BROKEN
    let mut started = 0;
    let mut completed = Vec::new();
    let mut failed = Vec::new();
    while let Ok(update) = receiver.try_recv() {
        match update.status {
            BatchStatus::Started => started += 1,
            BatchStatus::Completed { records, .. } => completed.push((update.company, records)),
            BatchStatus::Failed(_) => failed.push(update.company),
        }
    }
    assert_eq!(started, 2);
    assert_eq!(completed, vec![("AI.PA".to_string(), 20)]);
    assert_eq!(failed, vec!["BROKEN".to_string()]);
}
