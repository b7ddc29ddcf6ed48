use axum::{extract::State, Extension, Json};
use chrono::{Duration, NaiveDate, Utc};

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::recommendation::Recommendation;
use crate::models::stats::WeeklyStats;
use crate::services::history::{load_snapshot, HistorySnapshot};
use crate::services::rules::RuleContext;
use crate::services::weekly::{weekly_stats, WEEK_DAYS};
use crate::AppState;

/// Enough history for both weekly windows and every rule window.
async fn recent_history(state: &AppState, auth_user: &AuthUser, today: NaiveDate) -> AppResult<HistorySnapshot> {
    let days = state.engine.history_days().max(2 * WEEK_DAYS);
    load_snapshot(&state.db, auth_user.id, today - Duration::days(days - 1)).await
}

pub async fn get_weekly_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<WeeklyStats>> {
    let today = Utc::now().date_naive();
    let snapshot = recent_history(&state, &auth_user, today).await?;

    Ok(Json(weekly_stats(
        &snapshot,
        today,
        &state.config.rules.worry_sentinels,
    )))
}

/// Recomputed on every call; nothing is persisted.
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let now = Utc::now();
    let ctx = RuleContext {
        today: now.date_naive(),
        now,
    };
    let snapshot = recent_history(&state, &auth_user, ctx.today).await?;
    let recommendations = state.engine.evaluate(&snapshot, &ctx);

    tracing::info!(
        user_id = %auth_user.id,
        count = recommendations.len(),
        "Recommendations evaluated"
    );

    Ok(Json(recommendations))
}
