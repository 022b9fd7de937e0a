//! HTTP boundary for the engine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{ConfigSource, FileConfigSource};
use crate::engine::Engine;
use crate::error::{ConfigError, EngineError};

/// Shared application state.
#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Config file edited by the `/config` routes
    pub config_file: Arc<FileConfigSource>,
}

/// Error body returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::InventoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::LogFetchFailed { .. } | EngineError::NotificationFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            EngineError::ConfigUnreadable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %e, status = %status, "Request failed");
        Self::new(status, e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidEmail(_) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            other => {
                error!(error = %other, "Config operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the HTTP router.
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/alerts", get(list_alerts).delete(clear_alerts))
        .route("/alerts/scan", post(run_scan))
        .route("/dedup", delete(clear_dedup))
        .route("/workloads", get(list_workloads))
        .route("/logs/filter/{workload}", get(filtered_logs))
        .route(
            "/config/keywords",
            get(get_keywords)
                .post(add_keywords)
                .put(replace_keywords)
                .delete(remove_keywords),
        )
        .route(
            "/config/recipients",
            get(get_recipients)
                .post(add_recipient)
                .delete(remove_recipient),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "logforge" }))
}

async fn list_alerts(State(state): State<ServerState>) -> Json<Value> {
    let alerts = state.engine.list_alerts().await;
    Json(json!({ "count": alerts.len(), "alerts": alerts }))
}

async fn clear_alerts(State(state): State<ServerState>) -> Json<Value> {
    let cleared = state.engine.clear_alerts().await;
    Json(json!({ "cleared": cleared }))
}

async fn clear_dedup(State(state): State<ServerState>) -> Json<Value> {
    let cleared = state.engine.clear_dedup().await;
    Json(json!({ "cleared": cleared }))
}

async fn run_scan(State(state): State<ServerState>) -> ApiResult<Value> {
    info!("On-demand scan requested");
    let report = state.engine.run_cycle_once().await?;
    Ok(Json(json!(report)))
}

async fn list_workloads(State(state): State<ServerState>) -> ApiResult<Value> {
    let workloads = state.engine.workloads().await?;
    Ok(Json(json!({ "workloads": workloads })))
}

async fn filtered_logs(
    State(state): State<ServerState>,
    Path(workload): Path<String>,
) -> ApiResult<Value> {
    let Some(lines) = state.engine.filtered_logs(&workload).await? else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("unknown workload: {workload}"),
        ));
    };
    Ok(Json(json!({ "workload": workload, "lines": lines })))
}

#[derive(Debug, Deserialize)]
struct KeywordsRequest {
    /// Comma-separated keywords
    keywords: String,
}

async fn get_keywords(State(state): State<ServerState>) -> ApiResult<Value> {
    let config = state.config_file.load().await?;
    Ok(Json(json!({ "keywords": config.keywords() })))
}

async fn add_keywords(
    State(state): State<ServerState>,
    Json(request): Json<KeywordsRequest>,
) -> ApiResult<Value> {
    let change = state.config_file.add_keywords(&request.keywords).await?;
    Ok(Json(json!({ "added": change.applied, "already_present": change.unchanged })))
}

async fn remove_keywords(
    State(state): State<ServerState>,
    Json(request): Json<KeywordsRequest>,
) -> ApiResult<Value> {
    let change = state.config_file.remove_keywords(&request.keywords).await?;
    Ok(Json(json!({ "removed": change.applied, "not_found": change.unchanged })))
}

async fn replace_keywords(
    State(state): State<ServerState>,
    Json(request): Json<KeywordsRequest>,
) -> ApiResult<Value> {
    let keywords = state.config_file.replace_keywords(&request.keywords).await?;
    Ok(Json(json!({ "keywords": keywords })))
}

#[derive(Debug, Deserialize)]
struct RecipientRequest {
    /// Workload id, or `default`
    workload: String,
    email: String,
}

async fn get_recipients(State(state): State<ServerState>) -> ApiResult<Value> {
    let config = state.config_file.load().await?;
    Ok(Json(json!({ "recipients": config.email.recipients })))
}

async fn add_recipient(
    State(state): State<ServerState>,
    Json(request): Json<RecipientRequest>,
) -> ApiResult<Value> {
    let added = state
        .config_file
        .add_recipient(&request.workload, &request.email)
        .await?;
    Ok(Json(json!({ "added": added })))
}

async fn remove_recipient(
    State(state): State<ServerState>,
    Json(request): Json<RecipientRequest>,
) -> ApiResult<Value> {
    let removed = state
        .config_file
        .remove_recipient(&request.workload, &request.email)
        .await?;
    Ok(Json(json!({ "removed": removed })))
}
