//! Recommendation rules.
//!
//! Every rule is an independent predicate over its own window of the same
//! [`HistorySnapshot`]. The engine never lets one rule see another rule's
//! output, so adding or removing a rule cannot change what the others emit.
//! Evaluation is a pure function of `(snapshot, today, now)`; recommendation
//! ids are derived from the triggering evidence, so two evaluations of an
//! unchanged snapshot differ only in `created_at`.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::config::RulesConfig;
use crate::models::recommendation::{Category, Priority, Recommendation, RecommendationKind};
use crate::services::history::{mean, worry_mode, DaySummary, HistorySnapshot, Window};

#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

pub trait Rule: Send + Sync {
    /// Prefix of every recommendation id this rule emits.
    fn id(&self) -> &'static str;

    /// Calendar days, ending today, the rule looks at.
    fn window_days(&self) -> i64;

    /// Days of history handed to `evaluate`. Never shorter than the window.
    fn lookback_days(&self) -> i64 {
        self.window_days()
    }

    fn priority(&self) -> Priority;

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation>;
}

pub struct RecommendationEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RecommendationEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &RulesConfig) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = vec![Box::new(StressStreakRule {
            threshold: config.stress_alert_threshold,
            streak_days: config.stress_streak_days.max(1) as usize,
            lookback_days: STREAK_LOOKBACK_DAYS,
        })];

        if config.extended_rules_enabled {
            rules.push(Box::new(SleepDeficitRule::default()));
            rules.push(Box::new(MoodDeclineRule::default()));
            rules.push(Box::new(DominantWorryRule {
                sentinels: config.worry_sentinels.clone(),
                ..DominantWorryRule::default()
            }));
            rules.push(Box::new(CalmWeekRule {
                stress_ceiling: config.stress_alert_threshold,
                ..CalmWeekRule::default()
            }));
        }

        Self::new(rules)
    }

    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Longest lookback any rule needs; callers load at least this much history.
    pub fn history_days(&self) -> i64 {
        self.rules.iter().map(|r| r.lookback_days()).max().unwrap_or(0)
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn evaluate(&self, snapshot: &HistorySnapshot, ctx: &RuleContext) -> Vec<Recommendation> {
        let recommendations: Vec<Recommendation> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let window = snapshot.window(ctx.today, rule.lookback_days());
                rule.evaluate(&window, ctx)
            })
            .collect();

        tracing::debug!(
            rules = self.rules.len(),
            emitted = recommendations.len(),
            "Evaluated recommendation rules"
        );

        recommendations
    }
}

/// Days a stress streak must overlap, ending today, to raise an alert.
const STREAK_WINDOW_DAYS: i64 = 14;

/// How far back the start of an ongoing streak is looked up.
pub const STREAK_LOOKBACK_DAYS: i64 = 60;

/// Three (by default) consecutive calendar days with stress above the
/// threshold inside the last two weeks. Fires once, for the most recent
/// qualifying streak. A day with no stress value breaks the streak just like
/// a missing day. The streak is traced back past the window so its id stays
/// anchored on the day it began.
pub struct StressStreakRule {
    pub threshold: f64,
    pub streak_days: usize,
    pub lookback_days: i64,
}

impl StressStreakRule {
    /// Oldest day, newest day and length of the most recent streak with at
    /// least `streak_days` days on or after `since`.
    fn latest_streak(
        &self,
        days: &[DaySummary],
        since: NaiveDate,
    ) -> Option<(NaiveDate, NaiveDate, usize)> {
        let qualifies = |(oldest, newest, _): (NaiveDate, NaiveDate, usize)| {
            newest >= since
                && (newest - oldest.max(since)).num_days() + 1 >= self.streak_days as i64
        };

        let mut run: Option<(NaiveDate, NaiveDate, usize)> = None;
        for day in days {
            let hot = day.stress.is_some_and(|s| s > self.threshold);
            run = match run {
                Some((oldest, newest, len)) if hot && oldest - Duration::days(1) == day.date => {
                    Some((day.date, newest, len + 1))
                }
                previous => {
                    if let Some(found) = previous.filter(|r| qualifies(*r)) {
                        return Some(found);
                    }
                    hot.then_some((day.date, day.date, 1))
                }
            };
        }

        run.filter(|r| qualifies(*r))
    }
}

impl Rule for StressStreakRule {
    fn id(&self) -> &'static str {
        "stress-streak"
    }

    fn window_days(&self) -> i64 {
        STREAK_WINDOW_DAYS
    }

    fn lookback_days(&self) -> i64 {
        self.lookback_days.max(STREAK_WINDOW_DAYS)
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation> {
        let since = window.end - Duration::days(STREAK_WINDOW_DAYS - 1);
        let (oldest, newest, len) = self.latest_streak(&window.days(), since)?;
        Some(Recommendation::new(
            format!("{}:{}", self.id(), oldest),
            "Estrés elevado varios días seguidos",
            format!(
                "Has registrado {} días consecutivos con estrés mayor a {} (del {} al {}). \
                 Tómate un descanso, prueba técnicas de respiración o habla con alguien de confianza.",
                len,
                self.threshold,
                oldest.format("%d/%m"),
                newest.format("%d/%m"),
            ),
            Category::ALERT,
            self.priority(),
            RecommendationKind::Warning,
            ctx.now,
        ))
    }
}

/// Mean sleep below `max_mean_hours` over at least `min_days` days.
pub struct SleepDeficitRule {
    pub max_mean_hours: f64,
    pub min_days: usize,
}

impl Default for SleepDeficitRule {
    fn default() -> Self {
        Self {
            max_mean_hours: 6.0,
            min_days: 3,
        }
    }
}

impl Rule for SleepDeficitRule {
    fn id(&self) -> &'static str {
        "sleep-deficit"
    }

    fn window_days(&self) -> i64 {
        7
    }

    fn priority(&self) -> Priority {
        Priority::Medium
    }

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation> {
        let sleep: Vec<f64> = window.days().iter().filter_map(|d| d.sleep).collect();
        if sleep.len() < self.min_days {
            return None;
        }
        let avg = mean(sleep.iter().copied())?;
        if avg >= self.max_mean_hours {
            return None;
        }
        Some(Recommendation::new(
            format!("{}:{}", self.id(), window.end),
            "Estás durmiendo poco",
            format!(
                "Tu promedio de sueño esta semana es de {:.1} horas. Intenta mantener un horario \
                 regular y evita pantallas antes de dormir.",
                avg
            ),
            Category::SLEEP,
            self.priority(),
            RecommendationKind::Warning,
            ctx.now,
        ))
    }
}

/// Mood of the older half of the window exceeds the recent half by `min_drop`.
pub struct MoodDeclineRule {
    pub min_drop: f64,
    pub min_days: usize,
}

impl Default for MoodDeclineRule {
    fn default() -> Self {
        Self {
            min_drop: 2.0,
            min_days: 4,
        }
    }
}

impl Rule for MoodDeclineRule {
    fn id(&self) -> &'static str {
        "mood-decline"
    }

    fn window_days(&self) -> i64 {
        7
    }

    fn priority(&self) -> Priority {
        Priority::Medium
    }

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation> {
        // Most recent first.
        let moods: Vec<f64> = window.days().iter().filter_map(|d| d.mood).collect();
        if moods.len() < self.min_days {
            return None;
        }
        let half = moods.len() / 2;
        let recent = mean(moods[..half].iter().copied())?;
        let older = mean(moods[moods.len() - half..].iter().copied())?;
        if older - recent < self.min_drop {
            return None;
        }
        Some(Recommendation::new(
            format!("{}:{}", self.id(), window.end),
            "Tu estado de ánimo ha bajado",
            format!(
                "Tu ánimo pasó de {:.1} a {:.1} en los últimos días. Reserva tiempo para \
                 actividades que disfrutes y mantén el contacto con tus seres queridos.",
                older, recent
            ),
            Category::MOOD,
            self.priority(),
            RecommendationKind::Warning,
            ctx.now,
        ))
    }
}

/// One worry dominates the window: at least `min_count` entries and at least
/// `min_share` of all entries that named a worry.
pub struct DominantWorryRule {
    pub min_count: usize,
    pub min_share: f64,
    pub sentinels: Vec<String>,
}

impl Default for DominantWorryRule {
    fn default() -> Self {
        Self {
            min_count: 4,
            min_share: 0.5,
            sentinels: RulesConfig::default().worry_sentinels,
        }
    }
}

impl Rule for DominantWorryRule {
    fn id(&self) -> &'static str {
        "dominant-worry"
    }

    fn window_days(&self) -> i64 {
        14
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation> {
        let (worry, count, total) = worry_mode(window.entries(), &self.sentinels)?;
        if count < self.min_count || (count as f64) < self.min_share * total as f64 {
            return None;
        }
        Some(Recommendation::new(
            format!("{}:{}", self.id(), worry.to_lowercase()),
            format!("\"{}\" te preocupa con frecuencia", worry),
            format!(
                "Mencionaste \"{}\" en {} de tus últimos {} registros. Escribir un plan con pasos \
                 pequeños puede ayudarte a recuperar la sensación de control.",
                worry, count, total
            ),
            Category::WORRY,
            self.priority(),
            RecommendationKind::Info,
            ctx.now,
        ))
    }
}

/// Positive reinforcement: low mean stress and no day above the alert threshold.
pub struct CalmWeekRule {
    pub max_mean_stress: f64,
    pub stress_ceiling: f64,
    pub min_days: usize,
}

impl Default for CalmWeekRule {
    fn default() -> Self {
        Self {
            max_mean_stress: 4.0,
            stress_ceiling: 7.0,
            min_days: 3,
        }
    }
}

impl Rule for CalmWeekRule {
    fn id(&self) -> &'static str {
        "calm-week"
    }

    fn window_days(&self) -> i64 {
        7
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn evaluate(&self, window: &Window<'_>, ctx: &RuleContext) -> Option<Recommendation> {
        let stress: Vec<f64> = window.days().iter().filter_map(|d| d.stress).collect();
        if stress.len() < self.min_days || stress.iter().any(|&s| s > self.stress_ceiling) {
            return None;
        }
        let avg = mean(stress.iter().copied())?;
        if avg > self.max_mean_stress {
            return None;
        }
        Some(Recommendation::new(
            format!("{}:{}", self.id(), window.end),
            "¡Buena semana!",
            format!(
                "Tu nivel de estrés promedio esta semana es de {:.1}. Sigue con los hábitos que \
                 te están funcionando.",
                avg
            ),
            Category::WELLBEING,
            self.priority(),
            RecommendationKind::Success,
            ctx.now,
        ))
    }
}
