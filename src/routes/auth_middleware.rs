use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};
use crate::models::ErrorResponse;
use crate::services::AppState;
use crate::services::auth_service::{get_auth_token, principal_from_claims, validate_jwt};

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {

    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => return ErrorResponse::from_status(StatusCode::UNAUTHORIZED, e).into_response(),
    };

    // 2. Validate Token
    let secret = match &state.jwt_secret {
        Some(secret) => secret,
        None => {
            error!("Auth JWT secret not configured");
            return ErrorResponse::from_status(StatusCode::UNAUTHORIZED, "Authentication is not configured").into_response();
        }
    };
    let claims = match validate_jwt(&token, secret) {
        Ok(claims) => claims,
        Err(e) => {
            error!("JWT validation failed: {}", e);
            return ErrorResponse::from_status(StatusCode::UNAUTHORIZED, "Invalid auth token").into_response();
        }
    };

    // 3. Resolve the principal from the claims
    let principal = match principal_from_claims(&claims) {
        Ok(principal) => principal,
        Err(e) => {
            error!("{}", e);
            return ErrorResponse::from_status(StatusCode::UNAUTHORIZED, e).into_response();
        }
    };
    debug!("Request authenticated for {}", principal.username);

    // 4. Hand the principal to downstream handlers
    req.extensions_mut().insert(principal);
    next.run(req).await
}
