use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::schemas::{AccountResponse, LoginRequest, LoginResponse};
use crate::services::accounts;
use crate::state::AppState;

/// Authenticated account routes (login itself is public)
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/me", get(current_account))
        .with_state(state)
}

/// Exchange username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    request: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    // Malformed credentials get the same answer as wrong ones
    let request = match request {
        Ok(Json(request)) if request.validate().is_ok() => request,
        Ok(_) => return Err(AppError::Unauthorized("Invalid credentials".to_string())),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected malformed login body");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let (_, token) = accounts::login(&state.db, &request.username, &request.password).await?;

    Ok(Json(LoginResponse::bearer(token, CONFIG.auth.token_ttl_secs)))
}

async fn current_account(Extension(auth): Extension<AuthenticatedUser>) -> Json<AccountResponse> {
    Json(AccountResponse::from(auth.0))
}
