use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Form,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::error::AppError;
use common::storage::ledger::IngestionLedger;
use common::storage::snapshot::{is_snapshot_file, object_file_name};
use inventory::{fetch_snapshot, ServiceAccountKey};
use ingestion_pipeline::IngestionOutcome;

use crate::html_state::{CredentialContext, HtmlState};
use crate::middlewares::response_middleware::{HtmlError, TemplateResponse};

#[derive(Serialize, Default)]
struct DashboardData {
    has_credential: bool,
    project_id: Option<String>,
    latest_snapshot: Option<LatestSnapshotView>,
    fetched: Option<FetchedSnapshotView>,
    ingestion: Option<IngestionView>,
}

#[derive(Serialize)]
struct LatestSnapshotView {
    file_name: String,
    already_ingested: bool,
    index_name: Option<String>,
}

#[derive(Serialize)]
struct FetchedSnapshotView {
    file_name: String,
    record_count: usize,
}

#[derive(Serialize)]
struct IngestionView {
    status: String,
    file_name: Option<String>,
    index_name: Option<String>,
    chunks: Option<usize>,
}

impl From<IngestionOutcome> for IngestionView {
    fn from(outcome: IngestionOutcome) -> Self {
        match outcome {
            IngestionOutcome::NoSnapshots => Self {
                status: "no_snapshots".into(),
                file_name: None,
                index_name: None,
                chunks: None,
            },
            IngestionOutcome::AlreadyIngested {
                file_name,
                index_name,
            } => Self {
                status: "already_ingested".into(),
                file_name: Some(file_name),
                index_name: Some(index_name),
                chunks: None,
            },
            IngestionOutcome::Ingested {
                file_name,
                index_name,
                chunks,
            } => Self {
                status: "ingested".into(),
                file_name: Some(file_name),
                index_name: Some(index_name),
                chunks: Some(chunks),
            },
        }
    }
}

/// Shared page context: credential status plus the latest snapshot and its
/// ledger state.
async fn dashboard_data(state: &HtmlState) -> Result<DashboardData, AppError> {
    let (has_credential, project_id) = {
        let credential = state.credential.read().await;
        (
            credential.is_some(),
            credential.as_ref().map(|ctx| ctx.project_id.clone()),
        )
    };

    let latest_snapshot = match state.pipeline.latest_snapshot().await? {
        Some(meta) => {
            let file_name = object_file_name(meta.location.as_ref()).to_string();
            let ledger = IngestionLedger::load(&state.storage, &state.config.ledger_key).await?;
            let index_name = ledger.index_for(&file_name).map(str::to_string);
            Some(LatestSnapshotView {
                already_ingested: index_name.is_some(),
                index_name,
                file_name,
            })
        }
        None => None,
    };

    Ok(DashboardData {
        has_credential,
        project_id,
        latest_snapshot,
        ..Default::default()
    })
}

pub async fn show_dashboard(
    State(state): State<HtmlState>,
) -> Result<impl IntoResponse, HtmlError> {
    let data = dashboard_data(&state).await?;
    Ok(TemplateResponse::new_template("dashboard/index.html", data))
}

#[derive(Debug, TryFromMultipart)]
pub struct CredentialUploadParams {
    #[form_data(limit = "1000000")]
    pub credential: FieldData<Bytes>,
    #[form_data(default)]
    pub project_id: String,
}

pub async fn upload_credential(
    State(state): State<HtmlState>,
    TypedMultipart(input): TypedMultipart<CredentialUploadParams>,
) -> Result<impl IntoResponse, HtmlError> {
    let key = ServiceAccountKey::from_json(&input.credential.contents)?;

    let project_id = {
        let entered = input.project_id.trim();
        if entered.is_empty() {
            key.project_id.clone().ok_or_else(|| {
                AppError::Validation(
                    "the key has no project_id; enter a project identifier".into(),
                )
            })?
        } else {
            entered.to_string()
        }
    };

    info!(%project_id, issuer = %key.client_email, "Service account configured");
    *state.credential.write().await = Some(CredentialContext { key, project_id });

    Ok(TemplateResponse::redirect("/"))
}

pub async fn fetch_inventory(
    State(state): State<HtmlState>,
) -> Result<impl IntoResponse, HtmlError> {
    let Some(credential) = state.credential.read().await.clone() else {
        return Err(AppError::Validation(
            "upload a service account key and project id before fetching".into(),
        )
        .into());
    };

    let snapshot = fetch_snapshot(
        state.inventory_source.as_ref(),
        &credential.project_id,
        &credential.key,
    )
    .await?;

    // Spool a local copy for the download link before the store upload; the
    // store copy is deleted once ingested, the spooled one is not.
    let spool_path = state.spool_dir.join(&snapshot.file_name);
    tokio::fs::write(&spool_path, &snapshot.bytes)
        .await
        .map_err(AppError::Io)?;

    let location = format!("{}{}", state.config.snapshot_prefix, snapshot.file_name);
    state
        .storage
        .put(&location, snapshot.bytes.clone())
        .await
        .map_err(AppError::Storage)?;

    info!(
        file_name = %snapshot.file_name,
        records = snapshot.record_count,
        "Inventory snapshot uploaded"
    );

    let mut data = dashboard_data(&state).await?;
    data.fetched = Some(FetchedSnapshotView {
        file_name: snapshot.file_name,
        record_count: snapshot.record_count,
    });
    Ok(TemplateResponse::new_template("dashboard/index.html", data))
}

pub async fn download_snapshot(
    State(state): State<HtmlState>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, HtmlError> {
    // Only spooled snapshot names resolve; anything else 404s without
    // touching the filesystem.
    if file_name.contains('/') || !is_snapshot_file(&file_name) {
        return Err(AppError::NotFound(format!("snapshot {file_name}")).into());
    }

    let path = state.spool_dir.join(&file_name);
    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("snapshot {file_name}")).into());
        }
        Err(e) => return Err(AppError::Io(e).into()),
    };

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        ),
    ];

    Ok((StatusCode::OK, headers, contents).into_response())
}

#[derive(Deserialize)]
pub struct IngestionParams {
    index_name: String,
}

pub async fn start_ingestion(
    State(state): State<HtmlState>,
    Form(form): Form<IngestionParams>,
) -> Result<impl IntoResponse, HtmlError> {
    let index_name = form.index_name.trim().to_string();
    if index_name.is_empty() {
        return Err(AppError::Validation("enter an index name for ingestion".into()).into());
    }

    let outcome = state.pipeline.run(&index_name).await?;

    let mut data = dashboard_data(&state).await?;
    data.ingestion = Some(IngestionView::from(outcome));
    Ok(TemplateResponse::new_template("dashboard/index.html", data))
}
