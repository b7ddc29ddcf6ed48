use axum::{extract::State, Extension, Json};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::models::checkin::{CheckIn, CreateCheckInRequest};
use crate::AppState;

pub async fn create_checkin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<CreateCheckInRequest>,
) -> AppResult<Json<CheckIn>> {
    body.validate()?;
    let checkin_date = body.calendar_day(Utc::now().date_naive())?;

    let result = sqlx::query_as::<_, CheckIn>(
        r#"
        INSERT INTO checkins (id, user_id, checkin_date, mood, stress, sleep_hours, concern)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(checkin_date)
    .bind(body.mood)
    .bind(body.stress)
    .bind(body.sleep_hours)
    .bind(body.concern.trim())
    .fetch_one(&state.db)
    .await;

    // One check-in per user per calendar day.
    let checkin = match result {
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::Conflict(format!(
                "A check-in already exists for {}",
                checkin_date
            )));
        }
        other => other?,
    };

    tracing::info!(user_id = %auth_user.id, checkin_id = %checkin.id, date = %checkin_date, "Check-in recorded");

    Ok(Json(checkin))
}

pub async fn list_checkins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<CheckIn>>> {
    let checkins = sqlx::query_as::<_, CheckIn>(
        r#"
        SELECT * FROM checkins
        WHERE user_id = $1
        ORDER BY checkin_date DESC, created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(checkins))
}

pub async fn get_checkin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppPath(checkin_id): AppPath<Uuid>,
) -> AppResult<Json<CheckIn>> {
    let checkin = sqlx::query_as::<_, CheckIn>(
        "SELECT * FROM checkins WHERE id = $1 AND user_id = $2",
    )
    .bind(checkin_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Check-in not found".into()))?;

    Ok(Json(checkin))
}
