use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::PermissionView;
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult, Success};
use crate::services::{authorize, Action, PermissionInput};

/// GET /api/v1/permisos/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<PermissionView> {
    authorize(&principal, Action::Read)?;
    let permission = state.services.permissions.require(&id).await?;
    Ok(ApiResponse::success(permission))
}

/// PATCH /api/v1/permisos/:id - rename; `success` is false when nothing changed
pub async fn patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<PermissionInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state
        .services
        .permissions
        .update(&id, input, principal.user_id())
        .await?;
    Ok(ApiResponse::success(Success { success }))
}

/// DELETE /api/v1/permisos/:id - soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state.services.permissions.delete(&id).await?;
    Ok(ApiResponse::success(Success { success }))
}
