use chrono::{Duration, NaiveDate};

use crate::models::stats::{StressPoint, WeeklyStats};
use crate::services::history::{mean, worry_mode, HistorySnapshot};

pub const WEEK_DAYS: i64 = 7;

/// Differences smaller than this are reported as no change.
const DIFF_EPSILON: f64 = 1e-9;

/// Weekly summary over `today-6 ..= today`, compared with the seven days
/// before that. Means are taken over entries, not days; an empty window
/// averages to 0.0.
pub fn weekly_stats(snapshot: &HistorySnapshot, today: NaiveDate, worry_sentinels: &[String]) -> WeeklyStats {
    let current = snapshot.window(today, WEEK_DAYS);
    let previous = snapshot.window(today - Duration::days(WEEK_DAYS), WEEK_DAYS);

    let average_stress = mean(current.entries().iter().filter_map(|e| e.stress)).unwrap_or(0.0);
    let previous_week_stress =
        mean(previous.entries().iter().filter_map(|e| e.stress)).unwrap_or(0.0);
    let average_sleep = mean(current.entries().iter().filter_map(|e| e.sleep)).unwrap_or(0.0);

    let mut stress_diff = average_stress - previous_week_stress;
    if stress_diff.abs() < DIFF_EPSILON {
        stress_diff = 0.0;
    }

    let main_worry = worry_mode(current.entries(), worry_sentinels)
        .map(|(worry, _, _)| worry)
        .unwrap_or_default();

    let mut stress_history: Vec<StressPoint> = current
        .days()
        .into_iter()
        .filter_map(|d| d.stress.map(|stress| StressPoint { date: d.date, stress }))
        .collect();
    stress_history.reverse();

    WeeklyStats {
        average_stress,
        previous_week_stress,
        stress_diff,
        average_sleep,
        main_worry,
        stress_history,
    }
}
