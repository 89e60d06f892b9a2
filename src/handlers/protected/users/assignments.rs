use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{AssignmentFilter, AssignmentView};
use crate::handlers::protected::{body, params};
use crate::middleware::{ApiResponse, ApiResult, DataTable, Success};
use crate::services::{authorize, Action, UserRoleInput};

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentListQuery {
    pub draw: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sistema: Option<String>,
    pub rol: Option<String>,
    pub search: Option<String>,
}

/// GET /api/v1/usuarios/:id/asignaciones - (system, role, permission) lines
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    query: Result<Query<AssignmentListQuery>, QueryRejection>,
) -> ApiResult<DataTable<AssignmentView>> {
    authorize(&principal, Action::Read)?;
    let query = params(query)?;

    let filter = AssignmentFilter {
        sistema: query.sistema,
        rol: query.rol,
        search: query.search,
    };
    let page = state
        .services
        .assignments
        .user_assignments(&id, &filter, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::success(DataTable::new(query.draw, page)))
}

/// POST /api/v1/usuarios/:id/asignaciones - grant `{sistema_id, rol_id}`
pub async fn post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<UserRoleInput>, JsonRejection>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let success = state
        .services
        .assignments
        .assign_user_role(&id, &input.sistema_id, &input.rol_id)
        .await?;
    Ok(ApiResponse::created(Success { success }))
}

/// DELETE /api/v1/usuarios/:id/asignaciones/:sistema_id/:rol_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, sistema_id, rol_id)): Path<(String, String, String)>,
) -> ApiResult<Success> {
    authorize(&principal, Action::Write)?;
    let success = state
        .services
        .assignments
        .remove_user_role(&id, &sistema_id, &rol_id)
        .await?;
    Ok(ApiResponse::success(Success { success }))
}
