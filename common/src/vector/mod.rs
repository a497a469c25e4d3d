pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{info, warn};

use crate::error::AppError;

pub use http::{VectorIndexHandle, VectorServiceClient};

/// Serverless placement for a newly created index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub cloud: String,
    pub region: String,
}

/// One record upserted into an index: an opaque id, the embedding, and
/// metadata carrying at least a `content` field with the chunk's raw text.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// One ranked hit from a nearest-neighbour query. Ordering and tie-breaking
/// are whatever the index service's metric induces.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Control-plane operations on the index service.
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    async fn list_index_names(&self) -> Result<Vec<String>, AppError>;

    async fn create_index(
        &self,
        name: &str,
        dimension: u32,
        metric: &str,
        spec: &IndexSpec,
    ) -> Result<(), AppError>;
}

/// Data-plane operations on one named index.
#[async_trait]
pub trait VectorIndexOps: Send + Sync {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), AppError>;

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>, AppError>;
}

/// Create-if-absent bootstrap for a named index.
///
/// Creation is retried a fixed number of attempts with a fixed delay between
/// them; exhausting the attempts is terminal and the caller must not query or
/// ingest against the index. An index already present in the listing issues
/// no create call at all.
pub async fn ensure_index(
    catalog: &dyn IndexCatalog,
    name: &str,
    dimension: u32,
    metric: &str,
    spec: &IndexSpec,
    attempts: usize,
    delay: Duration,
) -> Result<(), AppError> {
    let existing = catalog.list_index_names().await?;
    if existing.iter().any(|candidate| candidate == name) {
        return Ok(());
    }

    info!(index = %name, dimension, metric, "Creating vector index");

    let retries = attempts.saturating_sub(1);
    let strategy = FixedInterval::new(delay).take(retries);
    Retry::spawn(strategy, || async {
        catalog
            .create_index(name, dimension, metric, spec)
            .await
            .inspect_err(|e| warn!(index = %name, error = %e, "Index creation attempt failed"))
    })
    .await
    .map_err(|e| {
        AppError::VectorIndex(format!(
            "failed to create index {name} after {attempts} attempts: {e}"
        ))
    })
}
