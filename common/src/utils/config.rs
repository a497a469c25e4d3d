use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
    S3,
}

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Inventory dashboard plus the question-answering surface.
    Full,
    /// Question-answering surface only.
    Qna,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

fn default_ui_mode() -> UiMode {
    UiMode::Full
}

/// Application configuration, sourced from an optional `config` file merged
/// with the process environment. `openai_api_key` and `vector_api_key` have
/// no defaults; a missing secret fails deserialization and aborts startup.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub vector_api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_vector_control_url")]
    pub vector_control_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    /// Bucket name, required when `storage = "s3"`.
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,
    #[serde(default = "default_ledger_key")]
    pub ledger_key: String,
    #[serde(default = "default_ui_mode")]
    pub ui_mode: UiMode,
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_index_metric")]
    pub index_metric: String,
    #[serde(default = "default_index_cloud")]
    pub index_cloud: String,
    #[serde(default = "default_index_region")]
    pub index_region: String,
    #[serde(default = "default_index_create_retries")]
    pub index_create_retries: usize,
    #[serde(default = "default_index_create_delay_secs")]
    pub index_create_delay_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_vector_control_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_query_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_snapshot_prefix() -> String {
    "inventory/".to_string()
}

fn default_ledger_key() -> String {
    "inventory/ingestion_log.json".to_string()
}

fn default_search_top_k() -> usize {
    6
}

fn default_max_documents() -> usize {
    3
}

fn default_index_metric() -> String {
    "euclidean".to_string()
}

fn default_index_cloud() -> String {
    "aws".to_string()
}

fn default_index_region() -> String {
    "us-east-1".to_string()
}

fn default_index_create_retries() -> usize {
    3
}

fn default_index_create_delay_secs() -> u64 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            vector_api_key: String::new(),
            openai_base_url: default_openai_base_url(),
            vector_control_url: default_vector_control_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            query_model: default_query_model(),
            http_port: 0,
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            s3_bucket: None,
            snapshot_prefix: default_snapshot_prefix(),
            ledger_key: default_ledger_key(),
            ui_mode: default_ui_mode(),
            search_top_k: default_search_top_k(),
            max_documents: default_max_documents(),
            index_metric: default_index_metric(),
            index_cloud: default_index_cloud(),
            index_region: default_index_region(),
            index_create_retries: default_index_create_retries(),
            index_create_delay_secs: default_index_create_delay_secs(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
