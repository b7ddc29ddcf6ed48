use std::env;
use std::str::FromStr;

use anyhow::{bail, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Postgres,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown session backend '{}'", other),
        }
    }
}

/// Thresholds for the recommendation rules.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// A day counts towards the stress streak when its stress is strictly above this.
    pub stress_alert_threshold: f64,
    pub stress_streak_days: u32,
    pub extended_rules_enabled: bool,
    /// Worry values that mean "no worry" (compared case-insensitively).
    pub worry_sentinels: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            stress_alert_threshold: 7.0,
            stress_streak_days: 3,
            extended_rules_enabled: true,
            worry_sentinels: vec!["none".into(), "ninguna".into()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub session_backend: SessionBackend,

    pub demo_mode: bool,

    pub claude_api_key: String,
    pub claude_model: String,

    pub rules: RulesConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = RulesConfig::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 8082)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_secs: parse_var("JWT_TTL_SECS", 86_400)?,
            session_backend: parse_var("SESSION_BACKEND", SessionBackend::Postgres)?,

            demo_mode: parse_var("DEMO_MODE", false)?,

            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_default(),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),

            rules: RulesConfig {
                stress_alert_threshold: parse_var(
                    "STRESS_ALERT_THRESHOLD",
                    defaults.stress_alert_threshold,
                )?,
                stress_streak_days: parse_var("STRESS_STREAK_DAYS", defaults.stress_streak_days)?,
                extended_rules_enabled: parse_var(
                    "EXTENDED_RULES_ENABLED",
                    defaults.extended_rules_enabled,
                )?,
                worry_sentinels: env::var("WORRY_SENTINELS")
                    .map(|v| split_list(&v))
                    .unwrap_or(defaults.worry_sentinels),
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<SessionBackend>().unwrap(), SessionBackend::Memory);
        assert_eq!(" postgres ".parse::<SessionBackend>().unwrap(), SessionBackend::Postgres);
        assert!("redis".parse::<SessionBackend>().is_err());
    }

    #[test]
    fn split_list_drops_blank_items() {
        assert_eq!(split_list("none, ninguna,,  "), vec!["none", "ninguna"]);
    }

    #[test]
    fn default_rules_match_documented_alert() {
        let rules = RulesConfig::default();
        assert_eq!(rules.stress_alert_threshold, 7.0);
        assert_eq!(rules.stress_streak_days, 3);
        assert!(rules.worry_sentinels.iter().any(|s| s == "ninguna"));
    }
}
