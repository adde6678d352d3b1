use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::StatementSource;
use crate::models::RawStatementBundle;

/// Default name of the ticker index written next to the bundles.
pub const TICKER_INDEX_FILE: &str = "yh_tickers.json";

/// Reads one `<ticker>.json` bundle per company from a directory.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
    index_file: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_file = root.join(TICKER_INDEX_FILE);
        Self { root, index_file }
    }

    /// Use a ticker index stored somewhere other than the data directory.
    pub fn with_index_file(mut self, index_file: impl Into<PathBuf>) -> Self {
        self.index_file = index_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_path(&self, company: &str) -> PathBuf {
        self.root.join(format!("{}.json", company))
    }

    /// Tickers from the index file (ticker -> company name).
    async fn read_index(&self) -> Result<Vec<String>> {
        let text = tokio::fs::read_to_string(&self.index_file)
            .await
            .with_context(|| format!("reading {}", self.index_file.display()))?;
        let index: BTreeMap<String, serde_json::Value> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", self.index_file.display()))?;
        Ok(index.into_keys().collect())
    }

    /// File stems of every `*.json` in the directory, the index excluded.
    async fn scan_directory(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("listing {}", self.root.display()))?;

        let mut companies = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == self.index_file || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                companies.push(stem.to_string());
            }
        }

        companies.sort();
        Ok(companies)
    }
}

#[async_trait::async_trait]
impl StatementSource for JsonDirectorySource {
    async fn list_companies(&self) -> Result<Vec<String>> {
        let companies = if tokio::fs::try_exists(&self.index_file).await.unwrap_or(false) {
            self.read_index().await?
        } else {
            debug!(
                "No ticker index at {}, scanning {}",
                self.index_file.display(),
                self.root.display()
            );
            self.scan_directory().await?
        };

        if companies.is_empty() {
            warn!("No companies found under {}", self.root.display());
        } else {
            info!("Retrieved {} companies from {}", companies.len(), self.root.display());
        }
        Ok(companies)
    }

    async fn load_bundle(&self, company: &str) -> Result<RawStatementBundle> {
        let path = self.bundle_path(company);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let bundle = RawStatementBundle::from_json_str(company, &text)?;
        Ok(bundle)
    }
}
