//! Concurrent ingestion and screening
//!
//! Companies are pulled from a shared queue by a fixed number of tokio
//! workers. Each worker loads a raw bundle, normalizes it, persists the
//! canonical records, reloads them from the store and screens them. A failure
//! is recorded against its company and the worker moves on.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

use crate::{
    analysis::GrahamScreener,
    database::DatabaseManager,
    models::graham_value::{ScreeningCriteria, ScreeningReport},
    normalizer,
    source::StatementSource,
};

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub worker_count: usize,
    pub criteria: ScreeningCriteria,
    /// Companies to process; empty means everything the source lists.
    pub companies: Vec<String>,
    pub max_companies: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            criteria: ScreeningCriteria::default(),
            companies: Vec::new(),
            max_companies: None,
        }
    }
}

/// Progress update from a worker
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub worker_id: usize,
    pub company: String,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    Started,
    Completed { records: usize, rules_passed: usize },
    Failed(String),
}

/// Result of a batch run
#[derive(Debug, Default)]
pub struct BatchResult {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub total_records: usize,
    pub reports: BTreeMap<String, ScreeningReport>,
    pub failures: BTreeMap<String, String>,
}

pub async fn run_batch(
    source: Arc<dyn StatementSource>,
    database: Arc<DatabaseManager>,
    config: BatchConfig,
) -> Result<BatchResult> {
    run_batch_with_progress(source, database, config, None).await
}

/// Run a batch, publishing per-company progress on `progress` when given.
pub async fn run_batch_with_progress(
    source: Arc<dyn StatementSource>,
    database: Arc<DatabaseManager>,
    config: BatchConfig,
    progress: Option<broadcast::Sender<BatchProgress>>,
) -> Result<BatchResult> {
    let companies = if config.companies.is_empty() {
        source.list_companies().await?
    } else {
        config.companies.clone()
    };

    let companies: VecDeque<String> = match config.max_companies {
        Some(max) => {
            info!("Limiting batch to {} companies", max);
            companies.into_iter().take(max).collect()
        }
        None => companies.into_iter().collect(),
    };

    let worker_count = config.worker_count.max(1);
    info!(
        "Starting batch of {} companies with {} workers",
        companies.len(),
        worker_count
    );

    let result = Arc::new(Mutex::new(BatchResult {
        total: companies.len(),
        ..Default::default()
    }));
    let queue = Arc::new(Mutex::new(companies));
    let screener = Arc::new(GrahamScreener::new(config.criteria.clone()));

    let mut handles = Vec::new();
    for worker_id in 0..worker_count {
        let queue = Arc::clone(&queue);
        let source = Arc::clone(&source);
        let database = Arc::clone(&database);
        let screener = Arc::clone(&screener);
        let result = Arc::clone(&result);
        let progress = progress.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, queue, source, database, screener, result, progress).await
        }));
    }

    for (worker_id, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
        if let Err(e) = joined {
            error!("Worker {} terminated abnormally: {}", worker_id, e);
        }
    }

    let result = std::mem::take(&mut *result.lock().await);
    info!(
        "Batch completed: {} processed, {} failed, {} records stored",
        result.processed, result.failed, result.total_records
    );
    Ok(result)
}

async fn worker(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<String>>>,
    source: Arc<dyn StatementSource>,
    database: Arc<DatabaseManager>,
    screener: Arc<GrahamScreener>,
    result: Arc<Mutex<BatchResult>>,
    progress: Option<broadcast::Sender<BatchProgress>>,
) {
    let publish = |company: &str, status: BatchStatus| {
        if let Some(sender) = &progress {
            let _ = sender.send(BatchProgress {
                worker_id,
                company: company.to_string(),
                status,
            });
        }
    };

    loop {
        let Some(company) = queue.lock().await.pop_front() else {
            break;
        };

        debug!("Worker {}: starting {}", worker_id, company);
        publish(&company, BatchStatus::Started);

        match process_company(source.as_ref(), &database, &screener, &company).await {
            Ok((records, report)) => {
                info!(
                    "Worker {}: {} done ({} years, {}/{} rules passed)",
                    worker_id,
                    company,
                    records,
                    report.passed_count(),
                    report.len()
                );
                publish(
                    &company,
                    BatchStatus::Completed {
                        records,
                        rules_passed: report.passed_count(),
                    },
                );

                let mut result = result.lock().await;
                result.processed += 1;
                result.total_records += records;
                result.reports.insert(company, report);
            }
            Err(e) => {
                error!("Worker {}: {} failed: {:#}", worker_id, company, e);
                publish(&company, BatchStatus::Failed(e.to_string()));

                let mut result = result.lock().await;
                result.failed += 1;
                result.failures.insert(company, format!("{:#}", e));
            }
        }
    }
}

/// Load, normalize, store, reload and screen one company.
pub async fn process_company(
    source: &dyn StatementSource,
    database: &DatabaseManager,
    screener: &GrahamScreener,
    company: &str,
) -> Result<(usize, ScreeningReport)> {
    let bundle = source.load_bundle(company).await?;
    let records = normalizer::normalize(company, &bundle)?;

    database
        .add_company(company, bundle.industry.as_deref(), bundle.country.as_deref())
        .await?;
    let stored = database.upsert_financials(company, &records).await?;

    let history = database.get_financials(company, None).await?;
    let report = screener.evaluate(&history);

    Ok((stored, report))
}
