use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Form,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::error::AppError;
use common::vector::{ensure_index, IndexSpec};
use retrieval_pipeline::{
    DefaultQueryServices, QueryConfig, QueryEngine, QueryOutcome,
};

use crate::html_state::HtmlState;
use crate::middlewares::response_middleware::{HtmlError, TemplateResponse};

#[derive(Serialize, Default)]
struct QnaPageData {
    index_name: Option<String>,
    question: Option<String>,
    exchange: Option<ExchangeView>,
    no_matches: bool,
}

#[derive(Serialize)]
struct ExchangeView {
    position: usize,
    question: String,
    answer: String,
    references: Vec<String>,
}

pub async fn show_qna(State(state): State<HtmlState>) -> Result<impl IntoResponse, HtmlError> {
    let index_name = state.latest_ingested_index().await?;
    Ok(TemplateResponse::new_template(
        "qna/index.html",
        QnaPageData {
            index_name,
            ..Default::default()
        },
    ))
}

#[derive(Deserialize)]
pub struct QuestionForm {
    question: String,
}

pub async fn ask_question(
    State(state): State<HtmlState>,
    Form(form): Form<QuestionForm>,
) -> Result<impl IntoResponse, HtmlError> {
    let question = form.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation("enter a question".into()).into());
    }

    // The QnA surface always queries the most recently ingested index.
    let Some(index_name) = state.latest_ingested_index().await? else {
        return Ok(TemplateResponse::new_template(
            "qna/index.html",
            QnaPageData::default(),
        ));
    };

    ensure_index(
        &state.vector_client,
        &index_name,
        state.config.embedding_dimensions,
        &state.config.index_metric,
        &IndexSpec {
            cloud: state.config.index_cloud.clone(),
            region: state.config.index_region.clone(),
        },
        state.config.index_create_retries,
        Duration::from_secs(state.config.index_create_delay_secs),
    )
    .await?;

    let index = state.vector_client.index(&index_name).await?;
    let services = DefaultQueryServices::new(
        state.embedding_provider.clone(),
        Arc::new(index),
        state.openai_client.clone(),
        state.config.query_model.clone(),
    );
    let engine = QueryEngine::new(services, QueryConfig::from_app_config(&state.config));

    let outcome = engine.answer(&question).await?;

    let data = match outcome {
        QueryOutcome::Answered(answer) => {
            let position = state.history.write().await.append(
                question.clone(),
                answer.content.clone(),
                answer.references.clone(),
            );
            info!(position, "Question answered and recorded in session history");
            QnaPageData {
                index_name: Some(index_name),
                exchange: Some(ExchangeView {
                    position,
                    question,
                    answer: answer.content,
                    references: answer.references,
                }),
                ..Default::default()
            }
        }
        QueryOutcome::NoMatches => QnaPageData {
            index_name: Some(index_name),
            question: Some(question),
            no_matches: true,
            ..Default::default()
        },
    };

    Ok(TemplateResponse::new_template("qna/index.html", data))
}

pub async fn show_history_entry(
    State(state): State<HtmlState>,
    Path(position): Path<usize>,
) -> Result<impl IntoResponse, HtmlError> {
    let index_name = state.latest_ingested_index().await?;

    let exchange = {
        let history = state.history.read().await;
        history.get(position).map(|entry| ExchangeView {
            position,
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            references: entry.references.clone(),
        })
    };

    let Some(exchange) = exchange else {
        return Err(AppError::NotFound(format!("history entry {position}")).into());
    };

    Ok(TemplateResponse::new_template(
        "qna/index.html",
        QnaPageData {
            index_name,
            exchange: Some(exchange),
            ..Default::default()
        },
    ))
}
