use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::PermissionView;
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult, Success};
use crate::services::{authorize, Action, RolePermissionInput};

/// GET /api/v1/roles/:id/permisos - permissions granted to the role
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Vec<PermissionView>> {
    authorize(&principal, Action::Read)?;
    let permissions = state.services.permissions.permissions_of_role(&id).await?;
    Ok(ApiResponse::success(permissions))
}

/// POST /api/v1/roles/:id/permisos - grant `{permiso_id}` to the role
pub async fn post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<RolePermissionInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state
        .services
        .assignments
        .assign_role_permission(&id, &input.permiso_id)
        .await?;
    Ok(ApiResponse::created(Success { success }))
}

/// DELETE /api/v1/roles/:id/permisos/:permiso_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, permiso_id)): Path<(String, String)>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state
        .services
        .assignments
        .remove_role_permission(&id, &permiso_id)
        .await?;
    Ok(ApiResponse::success(Success { success }))
}
