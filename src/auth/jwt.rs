use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    /// Session id; the token is only honoured while the session store holds it.
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub is_demo: bool,
}

pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub name: &'a str,
    pub is_demo: bool,
}

pub fn create_access_token(
    subject: &TokenSubject<'_>,
    session_id: Uuid,
    config: &Config,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.user_id,
        email: subject.email.to_string(),
        name: subject.name.to_string(),
        sid: session_id,
        exp: (now + Duration::seconds(config.jwt_ttl_secs)).timestamp(),
        iat: now.timestamp(),
        is_demo: subject.is_demo,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create access token: {}", e)))
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}
