use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::RoleView;
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult, Success};
use crate::services::{authorize, Action, RoleInput};

/// GET /api/v1/roles/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<RoleView> {
    authorize(&principal, Action::Read)?;
    let role = state.services.roles.require(&id).await?;
    Ok(ApiResponse::success(role))
}

/// PATCH /api/v1/roles/:id
pub async fn patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<RoleInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state
        .services
        .roles
        .update(&id, input, principal.user_id())
        .await?;
    Ok(ApiResponse::success(Success { success }))
}

/// DELETE /api/v1/roles/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state.services.roles.delete(&id).await?;
    Ok(ApiResponse::success(Success { success }))
}
