use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::config::SessionBackend;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mindjournal-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Database reachability plus the rule set this instance evaluates.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let sessions = match state.config.session_backend {
        SessionBackend::Memory => "memory",
        SessionBackend::Postgres => "postgres",
    };
    let (status, label) = if db_ok {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("Readiness probe failed: database unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(json!({
            "status": label,
            "checks": { "database": if db_ok { "ok" } else { "failed" } },
            "sessionBackend": sessions,
            "demoMode": state.config.demo_mode,
            "rules": state.engine.rule_ids(),
        })),
    )
}
