//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ConfigOverrides};
use crate::orchestrator::{InvestigationResult, Orchestrator};
use crate::tools::ToolRegistry;

use super::types::ApiResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
}

/// Start the HTTP server.
pub async fn serve(config: Config, registry: Arc<ToolRegistry>) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(config.clone(), registry);
    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/agent/investigate", post(investigate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Body of `POST /agent/investigate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigateRequest {
    pub query: String,
    /// Domain agents to enable; all built-ins when absent.
    #[serde(default)]
    pub domains: Option<Vec<String>>,
    #[serde(default)]
    pub config: Option<ConfigOverrides>,
}

/// POST /agent/investigate - run one investigation to completion.
async fn investigate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvestigateRequest>,
) -> (StatusCode, Json<ApiResponse<InvestigationResult>>) {
    let result = state
        .orchestrator
        .investigate(&req.query, req.config.as_ref(), req.domains.as_deref())
        .await;

    match result {
        Ok(result) => (
            StatusCode::OK,
            Json(ApiResponse::ok("investigation complete", result)),
        ),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}
