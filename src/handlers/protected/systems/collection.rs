use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{SystemFilter, SystemView};
use crate::handlers::protected::{body, params};
use crate::middleware::{ApiResponse, ApiResult, Created, DataTable, Listing};
use crate::services::{authorize, Action, SystemInput};

#[derive(Debug, Default, Deserialize)]
pub struct SystemListQuery {
    pub draw: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    /// Every live row as a bare array, ignoring paging and search.
    #[serde(default)]
    pub all: bool,
}

/// GET /api/v1/sistemas - one page of systems, or all of them with `all=true`
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<SystemListQuery>, QueryRejection>,
) -> ApiResult<Listing<SystemView>> {
    authorize(&principal, Action::Read)?;
    let query = params(query)?;

    if query.all {
        let all = state.services.systems.get_all().await?;
        return Ok(ApiResponse::success(Listing::All(all)));
    }

    let filter = SystemFilter {
        search: query.search,
    };
    let page = state
        .services
        .systems
        .list(&filter, query.limit, query.offset)
        .await?;

    Ok(ApiResponse::success(Listing::Table(DataTable::new(query.draw, page))))
}

/// POST /api/v1/sistemas - create a system
pub async fn post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<SystemInput>, JsonRejection>,
) -> ApiResult<Created> {
    authorize(&principal, Action::Write)?;
    let input = body(payload)?;

    let id = state.services.systems.create(input).await?;
    Ok(ApiResponse::created(Created { id }))
}
