use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub average_stress: f64,
    pub previous_week_stress: f64,
    /// `average_stress - previous_week_stress`; positive means stress went up.
    pub stress_diff: f64,
    pub average_sleep: f64,
    pub main_worry: String,
    pub stress_history: Vec<StressPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StressPoint {
    pub date: NaiveDate,
    pub stress: f64,
}
