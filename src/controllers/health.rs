use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::store::SeatBackend;
use crate::AppState;

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let store_ok = match state.store() {
        SeatBackend::Memory(_) => true,
        SeatBackend::Postgres(store) => match store.database().ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Health check: database ping failed");
                false
            }
        },
    };

    let cache = match &state.cache {
        None => "disabled",
        Some(cache) => {
            if cache.is_healthy().await {
                "ok"
            } else {
                "degraded"
            }
        }
    };

    let status = if store_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = json!({
        "status": if store_ok { "ok" } else { "unavailable" },
        "store": state.store().name(),
        "cache": cache,
        "environment": state.config.app.environment,
    });
    (status, Json(body))
}
