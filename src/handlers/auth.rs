use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    jwt::{create_access_token, TokenSubject},
    middleware::AuthUser,
    password::{hash_password, verify_password},
    session::Session,
};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::models::user::{
    AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, DEMO_USER_ID, DEMO_USER_NAME,
};
use crate::AppState;

/// Store a fresh session and sign a token bound to it.
async fn issue_session(state: &AppState, subject: TokenSubject<'_>) -> AppResult<AuthResponse> {
    let session = Session {
        id: Uuid::new_v4(),
        user_id: subject.user_id,
        expires_at: Utc::now() + Duration::seconds(state.config.jwt_ttl_secs),
    };
    let token = create_access_token(&subject, session.id, &state.config)?;
    state.sessions.set(session).await?;

    Ok(AuthResponse {
        id: subject.user_id,
        email: subject.email.to_string(),
        name: subject.name.to_string(),
        token,
    })
}

async fn demo_session(state: &AppState, email: &str) -> AppResult<Json<AuthResponse>> {
    tracing::info!(email = %email, "Demo mode: issuing demo session");
    let response = issue_session(
        state,
        TokenSubject {
            user_id: DEMO_USER_ID,
            email,
            name: DEMO_USER_NAME,
            is_demo: true,
        },
    )
    .await?;
    Ok(Json(response))
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    if state.config.demo_mode {
        return demo_session(&state, &email).await;
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let pwd_hash = hash_password(&body.password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(body.name.trim())
    .bind(&pwd_hash)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let response = issue_session(
        &state,
        TokenSubject {
            user_id: user.id,
            email: &user.email,
            name: &user.name,
            is_demo: false,
        },
    )
    .await?;
    Ok(Json(response))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    if state.config.demo_mode {
        return demo_session(&state, &email).await;
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = match user.password_hash.as_deref() {
        Some(hash) => verify_password(&body.password, hash)?,
        None => false,
    };
    if !valid {
        tracing::info!(user_id = %user.id, "Login rejected");
        return Err(AppError::Unauthorized);
    }

    let response = issue_session(
        &state,
        TokenSubject {
            user_id: user.id,
            email: &user.email,
            name: &user.name,
            is_demo: false,
        },
    )
    .await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    state.sessions.clear(auth_user.session_id).await?;
    tracing::info!(user_id = %auth_user.id, "Session cleared");
    Ok(Json(serde_json::json!({ "loggedOut": true })))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    if auth_user.is_demo {
        return Ok(Json(UserProfile {
            id: auth_user.id,
            email: auth_user.email,
            name: auth_user.name,
            is_demo: true,
            created_at: None,
        }));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(UserProfile::from(user)))
}
