use std::sync::Arc;
use std::time::Duration;

use object_store::ObjectMeta;
use tracing::info;

use common::error::AppError;
use common::storage::ledger::IngestionLedger;
use common::storage::snapshot::{is_snapshot_file, object_file_name};
use common::storage::store::StorageManager;
use common::utils::config::AppConfig;
use common::vector::{ensure_index, IndexCatalog, IndexSpec};

use crate::loader::SnapshotLoader;

/// Settings the orchestrator needs from the application configuration.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub snapshot_prefix: String,
    pub ledger_key: String,
    pub index_dimension: u32,
    pub index_metric: String,
    pub index_spec: IndexSpec,
    pub index_create_attempts: usize,
    pub index_create_delay: Duration,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            snapshot_prefix: config.snapshot_prefix.clone(),
            ledger_key: config.ledger_key.clone(),
            index_dimension: config.embedding_dimensions,
            index_metric: config.index_metric.clone(),
            index_spec: IndexSpec {
                cloud: config.index_cloud.clone(),
                region: config.index_region.clone(),
            },
            index_create_attempts: config.index_create_retries,
            index_create_delay: Duration::from_secs(config.index_create_delay_secs),
        }
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// Nothing under the snapshot prefix to ingest.
    NoSnapshots,
    /// The most recent snapshot is already a ledger key; the recorded index
    /// is surfaced unchanged and no loading happens.
    AlreadyIngested {
        file_name: String,
        index_name: String,
    },
    Ingested {
        file_name: String,
        index_name: String,
        chunks: usize,
    },
}

/// One-shot ingestion orchestrator.
///
/// Decides whether the most recently uploaded snapshot needs ingesting and,
/// if so, runs download -> load/chunk/embed/upsert -> ledger update -> source
/// cleanup. A loader failure aborts the run with the ledger and the snapshot
/// untouched, so the operator can simply re-invoke the run.
pub struct IngestionPipeline {
    storage: StorageManager,
    catalog: Arc<dyn IndexCatalog>,
    loader: Arc<dyn SnapshotLoader>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        storage: StorageManager,
        catalog: Arc<dyn IndexCatalog>,
        loader: Arc<dyn SnapshotLoader>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            storage,
            catalog,
            loader,
            config,
        }
    }

    /// The most recent snapshot under the configured prefix, by
    /// store-reported modification time. The ledger object shares the prefix
    /// and is excluded by name.
    pub async fn latest_snapshot(&self) -> Result<Option<ObjectMeta>, AppError> {
        let objects = self
            .storage
            .list(Some(&self.config.snapshot_prefix))
            .await?;
        Ok(select_latest(objects))
    }

    /// Run one ingestion against the operator-chosen target index.
    pub async fn run(&self, index_name: &str) -> Result<IngestionOutcome, AppError> {
        let Some(latest) = self.latest_snapshot().await? else {
            return Ok(IngestionOutcome::NoSnapshots);
        };
        let location = latest.location.to_string();
        let file_name = object_file_name(&location).to_string();

        let mut ledger = IngestionLedger::load(&self.storage, &self.config.ledger_key).await?;
        if let Some(existing) = ledger.index_for(&file_name) {
            info!(%file_name, index = existing, "Snapshot already ingested, skipping");
            return Ok(IngestionOutcome::AlreadyIngested {
                file_name,
                index_name: existing.to_string(),
            });
        }

        ensure_index(
            self.catalog.as_ref(),
            index_name,
            self.config.index_dimension,
            &self.config.index_metric,
            &self.config.index_spec,
            self.config.index_create_attempts,
            self.config.index_create_delay,
        )
        .await?;

        let payload = self.storage.get(&location).await?;
        let chunks = self
            .loader
            .load_and_index(&file_name, &payload, index_name)
            .await?;

        ledger.record(&file_name, index_name);
        ledger.save(&self.storage, &self.config.ledger_key).await?;

        self.storage.delete(&location).await?;

        info!(%file_name, index_name, chunks, "Ingestion run complete");
        Ok(IngestionOutcome::Ingested {
            file_name,
            index_name: index_name.to_string(),
            chunks,
        })
    }
}

/// Pick the snapshot with the greatest `last_modified`, deterministically and
/// independent of listing order.
fn select_latest(objects: Vec<ObjectMeta>) -> Option<ObjectMeta> {
    objects
        .into_iter()
        .filter(|meta| is_snapshot_file(object_file_name(meta.location.as_ref())))
        .max_by_key(|meta| meta.last_modified)
}
