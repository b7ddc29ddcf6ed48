//! History loading and normalisation.
//!
//! Check-ins and diary entries are folded into one [`HistoryEntry`] stream,
//! ordered most recent first, which the rule evaluator and the weekly
//! aggregator both read through [`HistorySnapshot::window`].

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::checkin::CheckIn;
use crate::models::diary::DiaryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    CheckIn,
    Diary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub source: EntrySource,
    pub mood: Option<f64>,
    pub stress: Option<f64>,
    pub sleep: Option<f64>,
    pub worry: Option<String>,
}

impl From<&CheckIn> for HistoryEntry {
    fn from(c: &CheckIn) -> Self {
        Self {
            date: c.date,
            recorded_at: c.created_at,
            source: EntrySource::CheckIn,
            mood: Some(f64::from(c.mood)),
            stress: Some(f64::from(c.stress)),
            sleep: Some(c.sleep_hours),
            worry: Some(c.concern.clone()),
        }
    }
}

impl From<&DiaryEntry> for HistoryEntry {
    fn from(d: &DiaryEntry) -> Self {
        Self {
            date: d.entry_date.date_naive(),
            recorded_at: d.entry_date,
            source: EntrySource::Diary,
            mood: Some(f64::from(d.mood_rating)),
            stress: d.stress_level.map(f64::from),
            sleep: d.sleep_hours,
            worry: d.main_worry.clone(),
        }
    }
}

impl HistoryEntry {
    /// Out-of-range metrics become missing so they never reach a threshold check.
    fn sanitized(mut self) -> Self {
        let scale = 1.0..=10.0;
        if self.mood.is_some_and(|v| !scale.contains(&v)) {
            tracing::warn!(date = %self.date, mood = ?self.mood, "Dropping out-of-range mood");
            self.mood = None;
        }
        if self.stress.is_some_and(|v| !scale.contains(&v)) {
            tracing::warn!(date = %self.date, stress = ?self.stress, "Dropping out-of-range stress");
            self.stress = None;
        }
        if self.sleep.is_some_and(|v| !(0.0..=12.0).contains(&v)) {
            tracing::warn!(date = %self.date, sleep = ?self.sleep, "Dropping out-of-range sleep");
            self.sleep = None;
        }
        self
    }
}

/// Per-day view: each metric is the mean of the values recorded that day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub mood: Option<f64>,
    pub stress: Option<f64>,
    pub sleep: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    entries: Vec<HistoryEntry>,
}

impl HistorySnapshot {
    pub fn new(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut entries: Vec<HistoryEntry> =
            entries.into_iter().map(HistoryEntry::sanitized).collect();
        entries.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.recorded_at.cmp(&a.recorded_at))
        });
        Self { entries }
    }

    pub fn from_records(checkins: &[CheckIn], diary: &[DiaryEntry]) -> Self {
        Self::new(
            checkins
                .iter()
                .map(HistoryEntry::from)
                .chain(diary.iter().map(HistoryEntry::from)),
        )
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `days` calendar days ending at `end`, inclusive.
    pub fn window(&self, end: NaiveDate, days: i64) -> Window<'_> {
        let start = end - Duration::days(days.max(1) - 1);
        let lo = self.entries.partition_point(|e| e.date > end);
        let hi = self.entries.partition_point(|e| e.date >= start);
        Window {
            start,
            end,
            entries: &self.entries[lo..hi],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    entries: &'a [HistoryEntry],
}

impl<'a> Window<'a> {
    /// Entries inside the window, most recent first.
    pub fn entries(&self) -> &'a [HistoryEntry] {
        self.entries
    }

    /// One summary per calendar day present in the window, most recent first.
    pub fn days(&self) -> Vec<DaySummary> {
        let mut days = Vec::new();
        let mut rest = self.entries;
        while let Some(first) = rest.first() {
            let len = rest.iter().take_while(|e| e.date == first.date).count();
            let (group, tail) = rest.split_at(len);
            days.push(DaySummary {
                date: first.date,
                mood: mean(group.iter().filter_map(|e| e.mood)),
                stress: mean(group.iter().filter_map(|e| e.stress)),
                sleep: mean(group.iter().filter_map(|e| e.sleep)),
            });
            rest = tail;
        }
        days
    }
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Most frequent worry among `entries`, skipping blanks and `sentinels`
/// (case-insensitive). Ties go to the worry seen first. Returns the worry,
/// its count and the number of entries that carried any qualifying worry.
pub fn worry_mode(entries: &[HistoryEntry], sentinels: &[String]) -> Option<(String, usize, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut total = 0;

    for worry in entries.iter().filter_map(|e| e.worry.as_deref()) {
        let worry = worry.trim();
        if worry.is_empty() || sentinels.iter().any(|s| s.eq_ignore_ascii_case(worry)) {
            continue;
        }
        total += 1;
        match counts.iter_mut().find(|(w, _)| *w == worry) {
            Some((_, n)) => *n += 1,
            None => counts.push((worry, 1)),
        }
    }

    // max_by_key keeps the last maximum; fold keeps the first.
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (w, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((w, n)),
        })
        .map(|(w, n)| (w.to_string(), n, total))
}

/// Loads every check-in and diary entry from `since` onwards.
pub async fn load_snapshot(db: &PgPool, user_id: Uuid, since: NaiveDate) -> AppResult<HistorySnapshot> {
    let checkins = sqlx::query_as::<_, CheckIn>(
        r#"
        SELECT * FROM checkins
        WHERE user_id = $1 AND checkin_date >= $2
        ORDER BY checkin_date DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(db)
    .await?;

    let since_ts = since.and_time(NaiveTime::MIN).and_utc();
    let diary = sqlx::query_as::<_, DiaryEntry>(
        r#"
        SELECT * FROM diary_entries
        WHERE user_id = $1 AND entry_date >= $2
        ORDER BY entry_date DESC
        "#,
    )
    .bind(user_id)
    .bind(since_ts)
    .fetch_all(db)
    .await?;

    tracing::debug!(
        user_id = %user_id,
        checkins = checkins.len(),
        diary_entries = diary.len(),
        "Loaded history snapshot"
    );

    Ok(HistorySnapshot::from_records(&checkins, &diary))
}
