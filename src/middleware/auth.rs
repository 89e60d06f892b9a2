use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{JwtKeys, Principal};
use crate::error::ApiError;

/// JWT authentication middleware that validates the bearer token and injects
/// the caller's `Principal` into the request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let principal = authenticate(&state.jwt, &token).map_err(ApiError::unauthorized)?;

    tracing::debug!("Authenticated {} ({:?})", principal.subject, principal.scope);
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn authenticate(keys: &JwtKeys, token: &str) -> Result<Principal, String> {
    keys.validate(token)
        .map(Principal::from)
        .map_err(|e| e.to_string())
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
