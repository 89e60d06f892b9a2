// handlers/protected/mod.rs - JWT-protected /api/v1 handlers
//
// The auth middleware has already validated the bearer token and stored a
// `Principal` in the request extensions; handlers pull it out with
// `Extension<Principal>` and authorize before calling the service layer.
pub mod permissions;
pub mod roles;
pub mod systems;
pub mod trees;
pub mod users;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};

use crate::error::ApiError;

/// Unwrap a JSON body, turning a rejection into the API error shape.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// Unwrap query parameters, turning a rejection into the API error shape.
pub(crate) fn params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(value)| value).map_err(ApiError::from)
}
