use anyhow::Result;

use crate::models::RawStatementBundle;

pub mod json_directory;
pub use json_directory::JsonDirectorySource;

/// Where raw statement bundles come from
#[async_trait::async_trait]
pub trait StatementSource: Send + Sync {
    /// Company identifiers this source can provide, in a stable order.
    async fn list_companies(&self) -> Result<Vec<String>>;

    async fn load_bundle(&self, company: &str) -> Result<RawStatementBundle>;
}
