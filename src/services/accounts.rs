//! Operator accounts
//!
//! There is a single operator role. The first account is seeded from config
//! at startup; login checks a bcrypt hash and hands out a session token.

use chrono::Utc;
use once_cell::sync::Lazy;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::config::CONFIG;
use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::user;
use crate::services::security::{
    create_access_token, generate_random_string, hash_password, verify_password,
};

/// Hash checked when the username is unknown, so both rejections cost one bcrypt run
static UNKNOWN_USER_HASH: Lazy<String> =
    Lazy::new(|| hash_password(&generate_random_string(16)).unwrap_or_default());

/// Create the configured admin account if no account exists yet.
///
/// Without `PRINTDESK_ADMIN_PASSWORD` a random password is generated and
/// logged once.
pub async fn ensure_admin_account(db: &DbConn) -> Result<()> {
    if User::find().count(db).await? > 0 {
        return Ok(());
    }

    let username = CONFIG.auth.admin_username.trim().to_string();
    let password = match CONFIG.auth.admin_password.clone() {
        Some(password) => password,
        None => {
            let generated = generate_random_string(12);
            tracing::warn!(
                username = %username,
                password = %generated,
                "PRINTDESK_ADMIN_PASSWORD not set, generated an initial admin password"
            );
            generated
        }
    };

    create_user(db, &username, &password).await?;
    tracing::info!(username = %username, "Created initial admin account");
    Ok(())
}

pub async fn create_user(db: &DbConn, username: &str, password: &str) -> Result<user::Model> {
    let now = Utc::now();
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        hashed_password: Set(hash_password(password)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    user.insert(db)
        .await
        .map_err(|e| crate::error::conflict_on_unique(e, "Username already exists"))
}

/// Check credentials. Unknown user and wrong password fail the same way.
pub async fn authenticate(db: &DbConn, username: &str, password: &str) -> Result<user::Model> {
    let user = User::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?;

    let verified = match &user {
        Some(user) => verify_password(password, &user.hashed_password),
        None => {
            verify_password(password, &UNKNOWN_USER_HASH);
            false
        }
    };

    match user {
        Some(user) if verified => Ok(user),
        _ => {
            tracing::info!(username = %username, "Rejected login attempt");
            Err(AppError::Unauthorized("Invalid credentials".to_string()))
        }
    }
}

/// Authenticate and issue a session token
pub async fn login(db: &DbConn, username: &str, password: &str) -> Result<(user::Model, String)> {
    let user = authenticate(db, username, password).await?;
    let token = create_access_token(user.id, &user.username)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok((user, token))
}
