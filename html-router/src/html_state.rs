use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use common::create_template_engine;
use common::error::AppError;
use common::storage::ledger::IngestionLedger;
use common::storage::store::StorageManager;
use common::utils::config::AppConfig;
use common::utils::embedding::{EmbeddingProvider, OpenAIClient};
use common::utils::history::SessionHistory;
use common::utils::template_engine::{ProvidesTemplateEngine, TemplateEngine};
use common::vector::VectorServiceClient;
use ingestion_pipeline::IngestionPipeline;
use inventory::{InventorySource, ServiceAccountKey};

/// Credential context captured by the upload form and consumed by the fetch
/// action. Replaced wholesale on every upload.
#[derive(Clone)]
pub struct CredentialContext {
    pub key: ServiceAccountKey,
    pub project_id: String,
}

/// Every handle the interactive surface needs, constructed once at startup
/// and injected; handlers read nothing from ambient scope.
#[derive(Clone)]
pub struct HtmlState {
    pub storage: StorageManager,
    pub templates: Arc<TemplateEngine>,
    pub config: AppConfig,
    pub openai_client: Arc<OpenAIClient>,
    pub embedding_provider: Arc<EmbeddingProvider>,
    pub vector_client: VectorServiceClient,
    pub inventory_source: Arc<dyn InventorySource>,
    pub pipeline: Arc<IngestionPipeline>,
    pub history: Arc<RwLock<SessionHistory>>,
    pub credential: Arc<RwLock<Option<CredentialContext>>>,
    /// Local directory holding downloadable copies of fetched snapshots.
    pub spool_dir: PathBuf,
}

impl HtmlState {
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_resources(
        storage: StorageManager,
        config: AppConfig,
        openai_client: Arc<OpenAIClient>,
        embedding_provider: Arc<EmbeddingProvider>,
        vector_client: VectorServiceClient,
        inventory_source: Arc<dyn InventorySource>,
        pipeline: Arc<IngestionPipeline>,
        spool_dir: PathBuf,
    ) -> Self {
        let templates = Arc::new(create_template_engine!());
        debug!("Template engine configured for html_router.");

        Self {
            storage,
            templates,
            config,
            openai_client,
            embedding_provider,
            vector_client,
            inventory_source,
            pipeline,
            history: Arc::new(RwLock::new(SessionHistory::default())),
            credential: Arc::new(RwLock::new(None)),
            spool_dir,
        }
    }

    /// The index the QnA surface queries: the one recorded for the most
    /// recent ingestion. `None` until something has been ingested.
    pub async fn latest_ingested_index(&self) -> Result<Option<String>, AppError> {
        let ledger = IngestionLedger::load(&self.storage, &self.config.ledger_key).await?;
        Ok(ledger
            .latest_entry()
            .map(|(_, index_name)| index_name.to_string()))
    }
}

impl ProvidesTemplateEngine for HtmlState {
    fn template_engine(&self) -> &Arc<TemplateEngine> {
        &self.templates
    }
}
