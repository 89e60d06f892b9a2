use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::SystemView;
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult, Success};
use crate::services::{authorize, Action, SystemInput};

/// GET /api/v1/sistemas/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<SystemView> {
    authorize(&principal, Action::Read)?;
    let system = state.services.systems.require(&id).await?;
    Ok(ApiResponse::success(system))
}

/// PATCH /api/v1/sistemas/:id - partial update; `success` is false when nothing changed
pub async fn patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<SystemInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state.services.systems.update(&id, input).await?;
    Ok(ApiResponse::success(Success { success }))
}

/// DELETE /api/v1/sistemas/:id - soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state.services.systems.delete(&id).await?;
    Ok(ApiResponse::success(Success { success }))
}
