pub mod html_state;
pub mod middlewares;
pub mod routes;

use axum::{middleware::from_fn_with_state, response::Redirect, routing::get, Router};
use tower_http::compression::CompressionLayer;

use common::utils::config::UiMode;
use html_state::HtmlState;
use middlewares::response_middleware::with_template_response;

/// Build the interactive surface. One entry point, with the mounted route
/// sets selected by the configured mode: `full` serves the inventory
/// dashboard plus QnA, `qna` serves the question surface alone.
pub fn html_routes(app_state: &HtmlState) -> Router {
    let router = match app_state.config.ui_mode {
        UiMode::Full => Router::new()
            .merge(routes::dashboard::router())
            .merge(routes::qna::router()),
        UiMode::Qna => Router::new()
            .route("/", get(|| async { Redirect::to("/qna") }))
            .merge(routes::qna::router()),
    };

    router
        .layer(from_fn_with_state(
            app_state.clone(),
            with_template_response,
        ))
        .layer(CompressionLayer::new())
        .with_state(app_state.clone())
}
