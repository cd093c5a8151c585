use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::Config,
    controller::{CapturedView, FormController, MessageReason, Messages, Panel},
    proxy::{PromptRequest, ProxyClient, ProxyError},
};

const INDEX_HTML: &str = include_str!("../static/index.html");

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: Arc<FormController>,
    pub proxy: Arc<ProxyClient>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieRequest {
    #[serde(default)]
    pub date: Option<String>,
}

impl MovieRequest {
    /// A body that is not a `{"date": string | null}` object is read as a
    /// submission without a date.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!("Unreadable movie request body, treating as no date: {}", e);
            MovieRequest::default()
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub store: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = if state.config.uses_memory_store() {
        "memory"
    } else {
        "sqlite"
    };
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
    })
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Every outcome, including invalid input and failed lookups, is a rendered
/// panel, so this always answers 200.
pub async fn submit_movie(State(state): State<AppState>, body: Bytes) -> Json<Panel> {
    let request = MovieRequest::from_slice(&body);
    let mut view = CapturedView::default();
    state
        .controller
        .submit(request.date.as_deref(), &mut view)
        .await;

    let panel = view.into_panel().unwrap_or_else(|| {
        tracing::error!("Controller finished without rendering a panel");
        let messages = Messages::default();
        Panel::Message {
            reason: MessageReason::LookupFailed,
            text: messages.lookup_failed,
        }
    });
    Json(panel)
}

pub async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    match forward_prompt(&state.proxy, &body).await {
        Ok(upstream) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            upstream,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Proxy request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn forward_prompt(proxy: &ProxyClient, body: &[u8]) -> Result<String, ProxyError> {
    let request = PromptRequest::from_slice(body)?;
    proxy.forward(&request.prompt).await
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/movie", post(submit_movie))
        .route("/api/generate", post(generate))
        .with_state(state)
}
