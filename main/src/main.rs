use std::sync::Arc;

use common::{
    storage::store::{resolve_base_dir, StorageManager},
    utils::{config::get_config, embedding::EmbeddingProvider},
    vector::VectorServiceClient,
};
use html_router::{html_routes, html_state::HtmlState};
use ingestion_pipeline::{DefaultSnapshotLoader, IngestionConfig, IngestionPipeline};
use inventory::AssetInventoryClient;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config; a missing required secret aborts startup here.
    let config = get_config()?;

    let http = reqwest::Client::new();

    let vector_client = VectorServiceClient::new(
        http.clone(),
        config.vector_api_key.clone(),
        config.vector_control_url.clone(),
    );

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider = Arc::new(EmbeddingProvider::new(
        openai_client.clone(),
        config.embedding_model.clone(),
        config.embedding_dimensions,
    ));
    info!(
        model = %embedding_provider.model(),
        dimensions = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let storage = StorageManager::new(&config).await?;

    // Spooled snapshot copies stay local and downloadable even when the
    // object store is remote.
    let spool_dir = resolve_base_dir(&config).join("spool");
    tokio::fs::create_dir_all(&spool_dir).await?;

    let loader = Arc::new(DefaultSnapshotLoader::new(
        embedding_provider.clone(),
        vector_client.clone(),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        storage.clone(),
        Arc::new(vector_client.clone()),
        loader,
        IngestionConfig::from_app_config(&config),
    ));

    let inventory_source = Arc::new(AssetInventoryClient::new(http));

    let html_state = HtmlState::new_with_resources(
        storage,
        config.clone(),
        openai_client,
        embedding_provider,
        vector_client,
        inventory_source,
        pipeline,
        spool_dir,
    );

    let app = html_routes(&html_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::utils::config::{AppConfig, StorageKind, UiMode};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn smoke_test_config(ui_mode: UiMode) -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            vector_api_key: "test-key".into(),
            openai_base_url: "https://example.com".into(),
            vector_control_url: "https://example.com".into(),
            storage: StorageKind::Memory,
            ui_mode,
            ..Default::default()
        }
    }

    async fn smoke_state(ui_mode: UiMode) -> HtmlState {
        let config = smoke_test_config(ui_mode);
        let http = reqwest::Client::new();

        let vector_client = VectorServiceClient::new(
            http.clone(),
            config.vector_api_key.clone(),
            config.vector_control_url.clone(),
        );
        let openai_client = Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));
        let embedding_provider = Arc::new(EmbeddingProvider::new(
            openai_client.clone(),
            config.embedding_model.clone(),
            config.embedding_dimensions,
        ));
        let storage = StorageManager::memory();

        let spool_dir = std::env::temp_dir().join(format!("copilot_smoke_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&spool_dir)
            .await
            .expect("create spool dir");

        let loader = Arc::new(DefaultSnapshotLoader::new(
            embedding_provider.clone(),
            vector_client.clone(),
        ));
        let pipeline = Arc::new(IngestionPipeline::new(
            storage.clone(),
            Arc::new(vector_client.clone()),
            loader,
            IngestionConfig::from_app_config(&config),
        ));
        let inventory_source = Arc::new(AssetInventoryClient::new(http));

        HtmlState::new_with_resources(
            storage,
            config,
            openai_client,
            embedding_provider,
            vector_client,
            inventory_source,
            pipeline,
            spool_dir,
        )
    }

    #[tokio::test]
    async fn smoke_dashboard_and_qna_render_in_full_mode() {
        let app = html_routes(&smoke_state(UiMode::Full).await);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let qna_response = app
            .oneshot(
                Request::builder()
                    .uri("/qna")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("qna response");
        assert_eq!(qna_response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn smoke_qna_mode_redirects_root_to_qna() {
        let app = html_routes(&smoke_state(UiMode::Qna).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/qna")
        );
    }
}
