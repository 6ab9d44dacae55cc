use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;
use crate::error::{AppError, Result};

// In-memory signing secret cache
static SIGNING_SECRET: Lazy<RwLock<Option<Vec<u8>>>> = Lazy::new(|| RwLock::new(None));

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid credentials".to_string()))
    }
}

/// Get the HMAC secret used to sign session tokens
fn signing_secret() -> Vec<u8> {
    // Fast path: check cache with read lock
    {
        let cache = SIGNING_SECRET.read();
        if let Some(secret) = cache.as_ref() {
            return secret.clone();
        }
    }

    let mut cache = SIGNING_SECRET.write();

    // Another thread might have initialized while we waited
    if let Some(secret) = cache.as_ref() {
        return secret.clone();
    }

    let secret = match CONFIG.auth.jwt_secret.as_deref() {
        Some(configured) => configured.as_bytes().to_vec(),
        None => {
            tracing::warn!(
                "PRINTDESK_JWT_SECRET not set, generating a per-process secret; sessions end on restart"
            );
            rand::rng().random::<[u8; 32]>().to_vec()
        }
    };

    *cache = Some(secret.clone());
    secret
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Create a signed session token for a user
pub fn create_access_token(user_id: i64, username: &str) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::seconds(CONFIG.auth.token_ttl_secs);

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(&signing_secret());
    encode(&Header::default(), &claims, &key).map_err(|e| e.into())
}

/// Decode and validate a session token
pub fn decode_token(token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(&signing_secret());

    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Generate a cryptographically secure random string (hex)
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..length).map(|_| rng.random()).collect();
    hex::encode(bytes)
}
