use axum::extract::{rejection::JsonRejection, Json, State};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Scope;
use crate::error::{ApiError, SERVER_ERROR_MESSAGE};
use crate::handlers::protected::body;
use crate::middleware::{ApiResponse, ApiResult};

const BAD_CREDENTIALS: &str = "usuario o contraseña incorrectos";

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(alias = "username")]
    pub correo: String,
    #[serde(alias = "password")]
    pub clave: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/v1/auth/token - exchange an active user's credentials for a
/// `self` token scoped to that user's own permission tree
pub async fn token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let input = body(payload)?;

    let Some(user) = state
        .services
        .users
        .verify_credentials(input.correo.trim(), &input.clave)
        .await?
    else {
        tracing::info!("Rejected token request for {}", input.correo.trim());
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    let token = state.jwt.issue(user.id.as_str(), Scope::SelfOnly).map_err(|e| {
        tracing::error!("Token signing failed for user {}: {}", user.id, e);
        ApiError::internal_server_error(SERVER_ERROR_MESSAGE)
    })?;

    tracing::debug!("Issued self token for user {}", user.id);
    Ok(ApiResponse::success(TokenResponse { token }))
}
