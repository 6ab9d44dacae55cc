//! Authentication middleware for API routes
//!
//! Requires a valid Bearer token. Every failure gets the same 401 body so
//! callers cannot tell a bad token from a removed account.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::EntityTrait;

use crate::models::prelude::*;
use crate::models::user;
use crate::services::security::decode_token;
use crate::state::AppState;

/// Authenticated user stored in request extensions
#[derive(Clone)]
pub struct AuthenticatedUser(pub user::Model);

/// Auth middleware that validates Bearer tokens.
///
/// Returns 401 Unauthorized if the token is missing, invalid or expired.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&req) {
        Some(t) => t,
        None => return unauthorized_response(),
    };

    let user = match validate_token_and_get_user(&state, &token).await {
        Ok(u) => u,
        Err(reason) => {
            tracing::debug!(reason = %reason, path = %req.uri().path(), "Rejected request");
            return unauthorized_response();
        }
    };

    req.extensions_mut().insert(AuthenticatedUser(user));

    next.run(req).await
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Option<String> {
    let auth_header = req.headers().get(AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .or_else(|| auth_str.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Validate the token and fetch its user from the database
async fn validate_token_and_get_user(state: &AppState, token: &str) -> Result<user::Model, String> {
    let claims = decode_token(token).map_err(|e| format!("token rejected: {}", e))?;

    let user_id = claims
        .user_id()
        .map_err(|_| "invalid token subject".to_string())?;

    let found_user = User::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| format!("database error: {}", e))?;

    found_user.ok_or_else(|| "user no longer exists".to_string())
}

/// Create a 401 Unauthorized JSON response
fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "detail": "Invalid credentials"
        })),
    )
        .into_response()
}
