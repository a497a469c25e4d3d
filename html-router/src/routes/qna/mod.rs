pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{ask_question, show_history_entry, show_qna};

use crate::html_state::HtmlState;

pub fn router() -> Router<HtmlState> {
    Router::new()
        .route("/qna", get(show_qna))
        .route("/qna/ask", post(ask_question))
        .route("/qna/history/{position}", get(show_history_entry))
}
