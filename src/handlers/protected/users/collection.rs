use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{UserFilter, UserView};
use crate::handlers::protected::{body, params};
use crate::middleware::{ApiResponse, ApiResult, Created, DataTable, Listing};
use crate::services::{authorize, Action, UserInput};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub draw: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub departamento: Option<String>,
    pub activo: Option<bool>,
    pub search: Option<String>,
    /// Every live user as a bare array, ignoring paging and filters.
    #[serde(default)]
    pub all: bool,
}

/// DataTable page plus the active/inactive counters shown above the table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTable {
    #[serde(flatten)]
    pub table: DataTable<UserView>,
    pub total_activos: i64,
    pub total_inactivos: i64,
}

/// GET /api/v1/usuarios
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> ApiResult<Listing<UserView, UserTable>> {
    authorize(&principal, Action::Read)?;
    let query = params(query)?;

    if query.all {
        let all = state.services.users.get_all().await?;
        return Ok(ApiResponse::success(Listing::All(all)));
    }

    let filter = UserFilter {
        departamento: query.departamento,
        activo: query.activo,
        search: query.search,
    };
    let list = state
        .services
        .users
        .list(&filter, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::success(Listing::Table(UserTable {
        table: DataTable::new(query.draw, list.page),
        total_activos: list.total_activos,
        total_inactivos: list.total_inactivos,
    })))
}

/// POST /api/v1/usuarios - new users start inactive
pub async fn post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Created> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let id = state
        .services
        .users
        .create(input, principal.user_id())
        .await?;
    Ok(ApiResponse::created(Created { id }))
}
