use crate::kinopoisk::DEFAULT_API_URL;
use crate::search::DEFAULT_SEARCH_URL;
use std::{str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is missing")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Настройки процесса, берутся из окружения (и `.env`, если он есть).
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub kp_api_token: String,
    pub kp_api_url: String,
    pub db_path: String,
    pub web_search_enabled: bool,
    pub search_url: String,
    pub search_lang: String,
    pub search_sleep: Duration,
    pub search_timeout: Duration,
    /// Нулевой TTL выключает кэш ссылок.
    pub search_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            get(name).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(name))
        };
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            kp_api_token: required("KP_API_TOKEN")?,
            kp_api_url: or_default("KP_API_URL", DEFAULT_API_URL),
            db_path: or_default("DB_PATH", "bot_users_database.db"),
            web_search_enabled: parse(&get, "WEB_SEARCH_ENABLED", true)?,
            search_url: or_default("SEARCH_URL", DEFAULT_SEARCH_URL),
            search_lang: or_default("SEARCH_LANG", "en"),
            search_sleep: Duration::from_secs(parse(&get, "SEARCH_SLEEP_SECS", 0)?),
            search_timeout: Duration::from_secs(parse(&get, "SEARCH_TIMEOUT_SECS", 5)?),
            search_cache_ttl: Duration::from_secs(parse(&get, "SEARCH_CACHE_TTL_SECS", 3600)?),
        })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
