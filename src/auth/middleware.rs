use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub session_id: Uuid,
    pub is_demo: bool,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(token, &state.config)?.claims;

    // A valid signature is not enough: logout clears the session.
    let session = state
        .sessions
        .get(claims.sid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if session.user_id != claims.sub {
        tracing::warn!(session_id = %claims.sid, "Session does not belong to token subject");
        return Err(AppError::Unauthorized);
    }

    let auth_user = AuthUser {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
        session_id: claims.sid,
        is_demo: claims.is_demo,
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}
