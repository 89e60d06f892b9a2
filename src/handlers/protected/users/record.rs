use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{RoleView, UserView};
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult, Success};
use crate::services::{authorize, Action, UserInput};

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    pub activo: bool,
}

/// GET /api/v1/usuarios/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<UserView> {
    authorize(&principal, Action::Read)?;
    let user = state.services.users.require(&id).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/v1/usuarios/:id - blank fields are ignored, a new clave is re-hashed
pub async fn patch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state.services.users.update(&id, input).await?;
    Ok(ApiResponse::success(Success { success }))
}

/// DELETE /api/v1/usuarios/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state.services.users.delete(&id).await?;
    Ok(ApiResponse::success(Success { success }))
}

/// PUT /api/v1/usuarios/:id/activo - activate or suspend
pub async fn set_active(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<ActiveBody>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let ActiveBody { activo } = body(payload)?;

    let success = state.services.users.set_active(&id, activo).await?;
    Ok(ApiResponse::success(Success { success }))
}

/// GET /api/v1/usuarios/:id/roles - roles held in any system
pub async fn roles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Vec<RoleView>> {
    authorize(&principal, Action::Read)?;
    let roles = state.services.roles.roles_of_user(&id).await?;
    Ok(ApiResponse::success(roles))
}
