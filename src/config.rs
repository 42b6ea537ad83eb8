use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::Context;
use log::info;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MockMate/0.1; +https://mockmate.dev)";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub database_url: String,
    pub database_auth_key: Option<String>,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub question_model: String,
    pub news_model: String,
    pub ai_timeout: Duration,

    pub fetch_timeout: Duration,
    pub fetch_user_agent: String,

    pub ingest_interval: Duration,
    pub scheduled_item_limit: usize,
    pub max_in_flight_generations: usize,

    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing keys fall back to defaults,
    /// present but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_hours: u64 = try_load(&lookup, "INGEST_INTERVAL_HOURS", "4")?;
        let ai_timeout_secs: u64 = try_load(&lookup, "AI_TIMEOUT_SECS", "30")?;
        let fetch_timeout_secs: u64 = try_load(&lookup, "FETCH_TIMEOUT_SECS", "30")?;

        Ok(Self {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "5200")?,
            database_url: try_load(&lookup, "DATABASE_URL", "./mockmate.db")?,
            database_auth_key: optional(&lookup, "DATABASE_AUTH_KEY"),
            openai_api_key: optional(&lookup, "OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: try_load(&lookup, "OPENAI_BASE_URL", "https://api.openai.com/v1")?,
            question_model: try_load(&lookup, "QUESTION_MODEL", "gpt-4.1-mini")?,
            news_model: try_load(&lookup, "NEWS_MODEL", "gpt-4o-mini")?,
            ai_timeout: Duration::from_secs(ai_timeout_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            fetch_user_agent: try_load(&lookup, "FETCH_USER_AGENT", DEFAULT_USER_AGENT)?,
            ingest_interval: Duration::from_secs(interval_hours * 60 * 60),
            scheduled_item_limit: try_load(&lookup, "SCHEDULED_ITEM_LIMIT", "5")?,
            max_in_flight_generations: try_load(&lookup, "MAX_IN_FLIGHT_GENERATIONS", "8")?,
            admin_token: optional(&lookup, "ADMIN_TOKEN"),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5200,
            database_url: "./mockmate.db".into(),
            database_auth_key: None,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".into(),
            question_model: "gpt-4.1-mini".into(),
            news_model: "gpt-4o-mini".into(),
            ai_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            fetch_user_agent: DEFAULT_USER_AGENT.into(),
            ingest_interval: Duration::from_secs(4 * 60 * 60),
            scheduled_item_limit: 5,
            max_in_flight_generations: 8,
            admin_token: None,
        }
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = optional(lookup, key).unwrap_or_else(|| {
        info!("[Config] {key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_matches_default() {
        let config = Config::from_lookup(|_| None).unwrap();
        let default = Config::default();

        assert_eq!(config.port, default.port);
        assert_eq!(config.database_url, default.database_url);
        assert_eq!(config.ingest_interval, Duration::from_secs(4 * 3600));
        assert_eq!(config.scheduled_item_limit, 5);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("INGEST_INTERVAL_HOURS", "1"),
            ("ADMIN_TOKEN", "secret"),
            ("DATABASE_AUTH_KEY", "   "),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.ingest_interval, Duration::from_secs(3600));
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert!(config.database_auth_key.is_none());
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
