use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::services::ListPage;

/// JSON response with an explicit status. The payload is sent as-is: list,
/// create and mutation endpoints each have their own wire shape.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        match serde_json::to_value(&self.data) {
            Ok(value) => (status, Json(value)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": true,
                        "message": crate::error::SERVER_ERROR_MESSAGE,
                        "code": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// `{id}` body returned by create endpoints.
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
}

/// `{success}` body returned by update, delete and assignment endpoints.
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

/// DataTables list envelope: `{draw, recordsTotal, recordsFiltered, data}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable<T: Serialize> {
    pub draw: i64,
    pub records_total: i64,
    pub records_filtered: i64,
    pub data: Vec<T>,
}

impl<T: Serialize> DataTable<T> {
    pub fn new(draw: Option<i64>, page: ListPage<T>) -> Self {
        Self {
            draw: draw.unwrap_or(0),
            records_total: page.records_total,
            records_filtered: page.records_filtered,
            data: page.data,
        }
    }
}

/// Collection GET body: one table page, or every live row as a bare array
/// when the caller asks for `all=true`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T: Serialize, Table: Serialize = DataTable<T>> {
    Table(Table),
    All(Vec<T>),
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
