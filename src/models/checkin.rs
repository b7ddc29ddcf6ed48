use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "checkin_date")]
    pub date: NaiveDate,
    pub mood: i32,
    pub stress: i32,
    pub sleep_hours: f64,
    pub concern: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckInRequest {
    /// Calendar day or RFC 3339 timestamp; today when absent.
    pub date: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Mood must be between 1 and 10"))]
    pub mood: i32,

    #[validate(range(min = 1, max = 10, message = "Stress must be between 1 and 10"))]
    pub stress: i32,

    #[serde(alias = "sleep")]
    #[validate(range(min = 0.0, max = 12.0, message = "Sleep must be between 0 and 12 hours"))]
    #[validate(custom = "validate_half_hours")]
    pub sleep_hours: f64,

    #[serde(default)]
    #[validate(length(max = 500, message = "Concern must be at most 500 characters"))]
    pub concern: String,
}

/// Clients ahead of the server's UTC day may send tomorrow's date.
const FUTURE_SLACK_DAYS: i64 = 1;

impl CreateCheckInRequest {
    pub fn calendar_day(&self, today: NaiveDate) -> AppResult<NaiveDate> {
        let day = match self.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_calendar_day(raw)?,
            _ => return Ok(today),
        };
        if day > today + Duration::days(FUTURE_SLACK_DAYS) {
            return Err(AppError::Validation(format!(
                "Check-in date {} is in the future",
                day
            )));
        }
        Ok(day)
    }
}

/// Accepts both `2026-10-14` and full timestamps such as
/// `2026-10-14T08:30:00.000Z`.
pub fn parse_calendar_day(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::Validation(format!("Invalid date '{}'", raw)))
}

pub(crate) fn validate_half_hours(hours: f64) -> Result<(), ValidationError> {
    if (hours * 2.0).fract() == 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("half_hours");
        err.message = Some("Sleep hours must use half-hour steps".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sleep: f64) -> CreateCheckInRequest {
        CreateCheckInRequest {
            date: None,
            mood: 6,
            stress: 4,
            sleep_hours: sleep,
            concern: "trabajo".into(),
        }
    }

    #[test]
    fn accepts_half_hour_sleep() {
        assert!(request(7.5).validate().is_ok());
        assert!(request(0.0).validate().is_ok());
    }

    #[test]
    fn rejects_sleep_off_the_half_hour_grid() {
        assert!(request(7.25).validate().is_err());
        assert!(request(12.5).validate().is_err());
    }

    #[test]
    fn legacy_sleep_field_is_accepted() {
        let req: CreateCheckInRequest = serde_json::from_str(
            r#"{"userId":"u1","date":"2026-10-14T08:30:00.000Z","mood":7,"stress":3,"sleep":8,"concern":""}"#,
        )
        .unwrap();
        assert_eq!(req.sleep_hours, 8.0);
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            req.calendar_day(today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
        );
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(request(7.0).calendar_day(today).unwrap(), today);
    }

    #[test]
    fn future_dates_beyond_one_day_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let dated = |raw: &str| CreateCheckInRequest {
            date: Some(raw.into()),
            ..request(7.0)
        };

        assert_eq!(
            dated("2026-10-17").calendar_day(today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
        assert!(matches!(
            dated("2026-10-18").calendar_day(today),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            dated("2027-01-01T00:00:00Z").calendar_day(today),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn garbage_date_is_a_validation_error() {
        assert!(matches!(
            parse_calendar_day("yesterday"),
            Err(AppError::Validation(_))
        ));
    }
}
