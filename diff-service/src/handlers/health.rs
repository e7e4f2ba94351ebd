use crate::startup::AppState;
use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;
use service_core::observability::get_metrics;

/// `GET /health`. Any request body is ignored.
///
/// With model probing enabled a one-word completion is issued on every call
/// and its failure turns into a 503.
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if !state.config.health.probe_model {
        return Ok(Json(json!({ "status": "ok" })));
    }

    let probe = match state.clients.model() {
        Ok(model) => model.health_check().await.map_err(AppError::from),
        Err(e) => Err(e),
    };

    match probe {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "dependencies": { "model": "ok" }
        }))),
        Err(e) => {
            tracing::warn!(error = %e, "Model health probe failed");
            Err(AppError::ServiceUnavailable(json!({
                "status": "error",
                "dependencies": { "model": "failed" }
            })))
        }
    }
}

/// `GET /ready`: 200 once both clients were constructed.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let storage = if state.clients.storage().is_ok() { "ok" } else { "not_configured" };
    let model = if state.clients.model().is_ok() { "ok" } else { "not_configured" };

    if state.clients.is_ready() {
        Ok(Json(json!({
            "status": "ready",
            "dependencies": { "storage": storage, "model": model }
        })))
    } else {
        Err(AppError::ServiceUnavailable(json!({
            "status": "not_ready",
            "dependencies": { "storage": storage, "model": model }
        })))
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
