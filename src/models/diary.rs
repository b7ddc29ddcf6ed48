use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::checkin::validate_half_hours;

pub const MIN_ENTRY_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ai_emotion", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_text: String,
    pub mood_rating: i32,
    pub stress_level: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub main_worry: Option<String>,
    pub ai_emotion: Option<Emotion>,
    pub ai_intensity: Option<f64>,
    pub ai_summary: Option<String>,
    pub entry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// POST /diary. Any id, entryDate or AI fields sent by the client are ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiaryEntryRequest {
    #[validate(custom = "validate_entry_text")]
    pub entry_text: String,

    #[validate(range(min = 1, max = 10, message = "Mood rating must be between 1 and 10"))]
    pub mood_rating: i32,

    #[validate(range(min = 1, max = 10, message = "Stress level must be between 1 and 10"))]
    pub stress_level: Option<i32>,

    #[validate(range(min = 0.0, max = 12.0, message = "Sleep must be between 0 and 12 hours"))]
    #[validate(custom = "validate_half_hours")]
    pub sleep_hours: Option<f64>,

    #[validate(length(max = 200, message = "Main worry must be at most 200 characters"))]
    pub main_worry: Option<String>,
}

/// PUT /diary/{id} replaces the whole user-editable record.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiaryEntryRequest {
    #[validate(custom = "validate_entry_text")]
    pub entry_text: String,

    #[validate(range(min = 1, max = 10, message = "Mood rating must be between 1 and 10"))]
    pub mood_rating: i32,

    #[validate(range(min = 1, max = 10, message = "Stress level must be between 1 and 10"))]
    pub stress_level: Option<i32>,

    #[validate(range(min = 0.0, max = 12.0, message = "Sleep must be between 0 and 12 hours"))]
    #[validate(custom = "validate_half_hours")]
    pub sleep_hours: Option<f64>,

    #[validate(length(max = 200, message = "Main worry must be at most 200 characters"))]
    pub main_worry: Option<String>,

    /// Keeps the stored date when absent.
    pub entry_date: Option<DateTime<Utc>>,
}

fn validate_entry_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().chars().count() >= MIN_ENTRY_CHARS {
        Ok(())
    } else {
        let mut err = ValidationError::new("entry_text_length");
        err.message = Some(
            format!("Entry text must be at least {} characters", MIN_ENTRY_CHARS).into(),
        );
        Err(err)
    }
}
