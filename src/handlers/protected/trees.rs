use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::EntityKind;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::validation::decode_id;
use crate::services::{authorize, Action, UserPermissionTree};

/// GET /api/v1/permisos-usuarios - every live user's permission tree
pub async fn all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<UserPermissionTree>> {
    authorize(&principal, Action::Read)?;
    let trees = state.services.trees.all().await?;
    Ok(ApiResponse::success(trees))
}

/// GET /api/v1/usuarios/:id/permisos - one user's tree; a user token may read its own
pub async fn one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<UserPermissionTree> {
    let user_id = decode_id(EntityKind::User, &id)?;
    authorize(&principal, Action::ReadTree { user_id })?;

    let tree = state.services.trees.for_user_id(user_id).await?;
    Ok(ApiResponse::success(tree))
}
