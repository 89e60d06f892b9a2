use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{PermissionFilter, PermissionView};
use crate::handlers::protected::{body, params};
use crate::middleware::{ApiResponse, ApiResult, Created, DataTable, Listing};
use crate::services::{authorize, Action, PermissionInput};

#[derive(Debug, Default, Deserialize)]
pub struct PermissionListQuery {
    pub draw: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    /// Every live row as a bare array, ignoring paging and search.
    #[serde(default)]
    pub all: bool,
}

/// GET /api/v1/permisos
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<PermissionListQuery>, QueryRejection>,
) -> ApiResult<Listing<PermissionView>> {
    authorize(&principal, Action::Read)?;
    let query = params(query)?;

    if query.all {
        let all = state.services.permissions.get_all().await?;
        return Ok(ApiResponse::success(Listing::All(all)));
    }

    let filter = PermissionFilter {
        search: query.search,
    };
    let page = state
        .services
        .permissions
        .list(&filter, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::success(Listing::Table(DataTable::new(query.draw, page))))
}

/// POST /api/v1/permisos - the caller is recorded as `created_by` when it is a user
pub async fn post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<PermissionInput>, JsonRejection>,
) -> ApiResult<Created> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let id = state
        .services
        .permissions
        .create(input, principal.user_id())
        .await?;
    Ok(ApiResponse::created(Created { id }))
}
