use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::store::StoreHealth;

/// GET /health - liveness plus a round trip to the store
pub async fn get(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let backend = state.store.backend_name();

    if let Err(e) = state.store.health_check().await {
        tracing::error!("Health check failed against {} store: {}", backend, e);
        return Err(ApiError::service_unavailable(format!(
            "{} store unavailable",
            backend
        )));
    }

    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "store": backend,
    })))
}
