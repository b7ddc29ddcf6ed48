use axum::{extract::State, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath};
use crate::models::diary::{CreateDiaryEntryRequest, DiaryEntry, UpdateDiaryEntryRequest};
use crate::AppState;

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn find_entry(state: &AppState, user_id: Uuid, entry_id: Uuid) -> AppResult<DiaryEntry> {
    sqlx::query_as::<_, DiaryEntry>("SELECT * FROM diary_entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Diary entry not found".into()))
}

/// Sentiment fields are filled before the insert so the response already
/// carries them.
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<CreateDiaryEntryRequest>,
) -> AppResult<Json<DiaryEntry>> {
    body.validate()?;
    let entry_text = body.entry_text.trim().to_string();
    let sentiment = state.analyzer.analyze(&entry_text).await;

    let entry = sqlx::query_as::<_, DiaryEntry>(
        r#"
        INSERT INTO diary_entries
            (id, user_id, entry_text, mood_rating, stress_level, sleep_hours, main_worry,
             ai_emotion, ai_intensity, ai_summary)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&entry_text)
    .bind(body.mood_rating)
    .bind(body.stress_level)
    .bind(body.sleep_hours)
    .bind(blank_to_none(body.main_worry))
    .bind(sentiment.emotion)
    .bind(sentiment.intensity)
    .bind(&sentiment.summary)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        user_id = %auth_user.id,
        entry_id = %entry.id,
        emotion = ?sentiment.emotion,
        source = ?sentiment.source,
        "Diary entry created"
    );

    Ok(Json(entry))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<DiaryEntry>>> {
    let entries = sqlx::query_as::<_, DiaryEntry>(
        r#"
        SELECT * FROM diary_entries
        WHERE user_id = $1
        ORDER BY entry_date DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppPath(entry_id): AppPath<Uuid>,
) -> AppResult<Json<DiaryEntry>> {
    Ok(Json(find_entry(&state, auth_user.id, entry_id).await?))
}

/// Replaces the user-editable fields. Sentiment is recomputed only when the
/// text changed.
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppPath(entry_id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateDiaryEntryRequest>,
) -> AppResult<Json<DiaryEntry>> {
    body.validate()?;
    let existing = find_entry(&state, auth_user.id, entry_id).await?;
    let entry_text = body.entry_text.trim().to_string();

    let (ai_emotion, ai_intensity, ai_summary) = if entry_text != existing.entry_text {
        let sentiment = state.analyzer.analyze(&entry_text).await;
        (Some(sentiment.emotion), Some(sentiment.intensity), Some(sentiment.summary))
    } else {
        (existing.ai_emotion, existing.ai_intensity, existing.ai_summary)
    };

    let entry = sqlx::query_as::<_, DiaryEntry>(
        r#"
        UPDATE diary_entries SET
            entry_text = $3,
            mood_rating = $4,
            stress_level = $5,
            sleep_hours = $6,
            main_worry = $7,
            ai_emotion = $8,
            ai_intensity = $9,
            ai_summary = $10,
            entry_date = $11,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(entry_id)
    .bind(auth_user.id)
    .bind(&entry_text)
    .bind(body.mood_rating)
    .bind(body.stress_level)
    .bind(body.sleep_hours)
    .bind(blank_to_none(body.main_worry))
    .bind(ai_emotion)
    .bind(ai_intensity)
    .bind(ai_summary)
    .bind(body.entry_date.unwrap_or(existing.entry_date))
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Diary entry not found".into()))?;

    tracing::info!(user_id = %auth_user.id, entry_id = %entry.id, "Diary entry updated");

    Ok(Json(entry))
}
