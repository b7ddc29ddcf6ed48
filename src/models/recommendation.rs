use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Presentation hint consumed by the client as `type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Warning,
    Info,
    Success,
}

/// Open set of category names: lowercase ASCII letters, digits, `_` or `-`,
/// 1 to 32 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(Cow<'static, str>);

impl Category {
    pub const ALERT: Category = Category(Cow::Borrowed("alert"));
    pub const SLEEP: Category = Category(Cow::Borrowed("sleep"));
    pub const MOOD: Category = Category(Cow::Borrowed("mood"));
    pub const WORRY: Category = Category(Cow::Borrowed("worry"));
    pub const WELLBEING: Category = Category(Cow::Borrowed("wellbeing"));

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let valid = !raw.is_empty()
            && raw.len() <= 32
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(Cow::Owned(raw.to_string())))
        } else {
            Err(AppError::Validation(format!("Invalid category '{}'", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.0.into_owned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Stable across re-evaluations of the same history.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Same text as `description`; older client screens read this name.
    pub message: String,
    pub category: Category,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn new(
        id: String,
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        priority: Priority,
        kind: RecommendationKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        let description = description.into();
        Self {
            id,
            title: title.into(),
            message: description.clone(),
            description,
            category,
            priority,
            kind,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_validation() {
        assert!(Category::parse("stress-management").is_ok());
        assert!(Category::parse("").is_err());
        assert!(Category::parse("Sleep").is_err());
        assert!(Category::parse(&"x".repeat(33)).is_err());
    }

    #[test]
    fn invalid_category_fails_deserialization() {
        assert!(serde_json::from_str::<Category>("\"NOT VALID\"").is_err());
        assert_eq!(
            serde_json::from_str::<Category>("\"alert\"").unwrap(),
            Category::ALERT
        );
    }

    #[test]
    fn wire_shape_matches_client() {
        let rec = Recommendation::new(
            "stress-streak:2026-10-10".into(),
            "Estrés elevado",
            "Tres días seguidos",
            Category::ALERT,
            Priority::High,
            RecommendationKind::Warning,
            Utc::now(),
        );
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["type"], "warning");
        assert_eq!(json["category"], "alert");
        assert_eq!(json["description"], json["message"]);
        assert!(json.get("createdAt").is_some());
    }
}
