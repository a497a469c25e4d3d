use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use axum_htmx::{HxRequest, HX_REDIRECT, HX_TRIGGER};
use common::{
    error::AppError,
    utils::template_engine::{ProvidesTemplateEngine, Value},
};
use minijinja::context;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::html_state::HtmlState;

/// How a handler's result should be rendered.
#[derive(Clone, Debug)]
pub enum TemplateKind {
    Full(String),
    Partial(String, String),
    Error(StatusCode),
    Redirect(String),
}

/// Deferred template render. Handlers return one of these; the response
/// middleware does the actual rendering so every full page shares the same
/// wrapper context (sidebar history, mode).
#[derive(Clone)]
pub struct TemplateResponse {
    template_kind: TemplateKind,
    context: Value,
}

impl TemplateResponse {
    pub fn new_template<T: Serialize>(name: impl Into<String>, context: T) -> Self {
        Self {
            template_kind: TemplateKind::Full(name.into()),
            context: Value::from_serialize(&context),
        }
    }

    pub fn new_partial<T: Serialize>(
        template: impl Into<String>,
        block: impl Into<String>,
        context: T,
    ) -> Self {
        Self {
            template_kind: TemplateKind::Partial(template.into(), block.into()),
            context: Value::from_serialize(&context),
        }
    }

    pub fn error(status: StatusCode, title: &str, description: &str) -> Self {
        let ctx = context! {
            status_code => status.as_u16(),
            title => title,
            description => description
        };
        Self {
            template_kind: TemplateKind::Error(status),
            context: ctx,
        }
    }

    pub fn not_found() -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            "Page Not Found",
            "The page you're looking for doesn't exist or was removed.",
        )
    }

    pub fn server_error() -> Self {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Something went wrong on our end.",
        )
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(StatusCode::BAD_REQUEST, "Bad Request", message)
    }

    pub fn upstream_error(message: &str) -> Self {
        Self::error(StatusCode::BAD_GATEWAY, "Operation Failed", message)
    }

    pub fn redirect(path: impl Into<String>) -> Self {
        Self {
            template_kind: TemplateKind::Redirect(path.into()),
            context: Value::from_serialize(()),
        }
    }
}

impl IntoResponse for TemplateResponse {
    fn into_response(self) -> Response {
        Extension(self).into_response()
    }
}

/// One sidebar entry: a prior question addressed by its history position.
#[derive(Serialize)]
struct HistoryLink {
    position: usize,
    question: String,
}

#[derive(Serialize)]
struct ContextWrapper<'a> {
    qna_history: Vec<HistoryLink>,
    ui_mode: &'a str,
    #[serde(flatten)]
    context: HashMap<String, Value>,
}

/// Render deferred [`TemplateResponse`]s, wrapping full pages with the shared
/// sidebar context. Errors become htmx toast triggers when the request came
/// from htmx, full error pages otherwise.
pub async fn with_template_response(
    State(state): State<HtmlState>,
    HxRequest(is_htmx): HxRequest,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    let Some(template_response) = response.extensions().get::<TemplateResponse>().cloned() else {
        return response;
    };

    let template_engine = state.template_engine();

    let qna_history = {
        let history = state.history.read().await;
        history
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| HistoryLink {
                position,
                question: entry.question.clone(),
            })
            .collect()
    };

    let context_map = match context_to_map(&template_response.context) {
        Ok(map) => map,
        Err(kind) => {
            error!(
                "Template context must be a map or unit, got kind={:?} for template_kind={:?}",
                kind, template_response.template_kind
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response();
        }
    };

    let ui_mode = match state.config.ui_mode {
        common::utils::config::UiMode::Full => "full",
        common::utils::config::UiMode::Qna => "qna",
    };

    let context = ContextWrapper {
        qna_history,
        ui_mode,
        context: context_map,
    };

    match &template_response.template_kind {
        TemplateKind::Full(name) => {
            match template_engine.render(name, &Value::from_serialize(&context)) {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    error!("Failed to render template '{}': {:?}", name, e);
                    (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response()
                }
            }
        }
        TemplateKind::Partial(template, block) => {
            match template_engine.render_block(template, block, &Value::from_serialize(&context)) {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    error!("Failed to render block '{}/{}': {:?}", template, block, e);
                    (StatusCode::INTERNAL_SERVER_ERROR, Html(fallback_error())).into_response()
                }
            }
        }
        TemplateKind::Error(status) => {
            if is_htmx {
                // htmx request: 204 plus an HX-Trigger toast payload.
                let title = template_response
                    .context
                    .get_attr("title")
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_else(|| "Error".to_string());
                let description = template_response
                    .context
                    .get_attr("description")
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_else(|| "An error occurred.".to_string());

                let trigger_payload =
                    json!({"toast": {"title": title, "description": description, "type": "error"}});
                let trigger_value = serde_json::to_string(&trigger_payload).unwrap_or_else(|e| {
                    error!("Failed to serialize HX-Trigger payload: {}", e);
                    r#"{"toast":{"title":"Error","description":"An unexpected error occurred.", "type":"error"}}"#
                        .to_string()
                });
                (StatusCode::NO_CONTENT, [(HX_TRIGGER, trigger_value)], "").into_response()
            } else {
                match template_engine.render("errors/error.html", &Value::from_serialize(&context))
                {
                    Ok(html) => (*status, Html(html)).into_response(),
                    Err(e) => {
                        error!("Critical: Failed to render 'errors/error.html': {:?}", e);
                        (*status, Html(fallback_error())).into_response()
                    }
                }
            }
        }
        TemplateKind::Redirect(path) => {
            if is_htmx {
                (StatusCode::OK, [(HX_REDIRECT, path.as_str())], "").into_response()
            } else {
                Redirect::to(path).into_response()
            }
        }
    }
}

fn context_to_map(value: &Value) -> Result<HashMap<String, Value>, minijinja::value::ValueKind> {
    match value.kind() {
        minijinja::value::ValueKind::Map => {
            let mut map = HashMap::new();
            if let Ok(keys) = value.try_iter() {
                for key in keys {
                    if let Ok(val) = value.get_item(&key) {
                        map.insert(key.to_string(), val);
                    }
                }
            }
            Ok(map)
        }
        minijinja::value::ValueKind::None | minijinja::value::ValueKind::Undefined => {
            Ok(HashMap::new())
        }
        other => Err(other),
    }
}

#[derive(Debug)]
pub enum HtmlError {
    AppError(AppError),
    TemplateError(String),
}

impl From<AppError> for HtmlError {
    fn from(err: AppError) -> Self {
        Self::AppError(err)
    }
}

impl From<minijinja::Error> for HtmlError {
    fn from(err: minijinja::Error) -> Self {
        Self::TemplateError(err.to_string())
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        match self {
            Self::AppError(err) => match err {
                AppError::NotFound(_) => TemplateResponse::not_found().into_response(),
                AppError::Validation(msg) => TemplateResponse::bad_request(&msg).into_response(),
                // Remote-call failures are user-visible: the operation aborted
                // and can be retried by the operator.
                AppError::Inventory(msg)
                | AppError::VectorIndex(msg)
                | AppError::LedgerConflict(msg) => {
                    TemplateResponse::upstream_error(&msg).into_response()
                }
                AppError::OpenAI(e) => {
                    TemplateResponse::upstream_error(&e.to_string()).into_response()
                }
                _ => {
                    error!("Internal error: {:?}", err);
                    TemplateResponse::server_error().into_response()
                }
            },
            Self::TemplateError(err) => {
                error!("Template error: {}", err);
                TemplateResponse::server_error().into_response()
            }
        }
    }
}

fn fallback_error() -> String {
    r#"
    <html>
        <body>
            <div class="container">
                <h1>Error</h1>
                <p>Sorry, something went wrong displaying this page.</p>
            </div>
        </body>
    </html>
    "#
    .to_string()
}
