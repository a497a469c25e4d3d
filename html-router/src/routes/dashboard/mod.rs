pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{
    download_snapshot, fetch_inventory, show_dashboard, start_ingestion, upload_credential,
};

use crate::html_state::HtmlState;

pub fn router() -> Router<HtmlState> {
    Router::new()
        .route("/", get(show_dashboard))
        .route("/credential", post(upload_credential))
        .route("/inventory/fetch", post(fetch_inventory))
        .route("/inventory/download/{file_name}", get(download_snapshot))
        .route("/ingestion", post(start_ingestion))
}
