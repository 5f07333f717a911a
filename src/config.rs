//! # Bot Configuration Module
//!
//! Environment-driven settings for the transport, storage, lexicon and the
//! external film search services.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

// Defaults for external service access
pub const DEFAULT_WIKIPEDIA_LANG: &str = "en";
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SHORTENER_ENDPOINT: &str = "http://tinyurl.com/api-create.php";
/// Sessions untouched this long are dropped from memory (one day)
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 86_400;

/// Circuit breaker settings for the search provider
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Consecutive failures before the provider is skipped
    pub circuit_breaker_threshold: u32,
    /// Cool-down in seconds before the provider is tried again
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Film search and link shortening settings
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Wikipedia language edition, e.g. "en" or "ru"
    pub wikipedia_lang: String,
    /// Full opensearch endpoint; derived from `wikipedia_lang` when unset
    pub api_url: Option<String>,
    /// Number of candidate pages requested from the provider
    pub max_results: usize,
    /// HTTP timeout for search and shortening calls
    pub timeout_secs: u64,
    /// Shortener endpoint accepting `?url=<long url>`
    pub shortener_endpoint: String,
    /// Whether suggestion links are shortened at all
    pub shorten_links: bool,
    pub recovery: RecoveryConfig,
}

impl SearchConfig {
    /// Opensearch endpoint of the configured Wikipedia edition
    pub fn endpoint(&self) -> String {
        match &self.api_url {
            Some(url) => url.clone(),
            None => format!("https://{}.wikipedia.org/w/api.php", self.wikipedia_lang),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            wikipedia_lang: DEFAULT_WIKIPEDIA_LANG.to_string(),
            api_url: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            shortener_endpoint: DEFAULT_SHORTENER_ENDPOINT.to_string(),
            shorten_links: true,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// PostgreSQL URL; in-memory storage is used when absent
    pub database_url: Option<String>,
    pub locales_dir: PathBuf,
    /// Idle time after which a user's session is forgotten
    pub session_idle_secs: u64,
    pub search: SearchConfig,
}

impl BotConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("TELEGRAM_BOT_TOKEN must be set")?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let locales_dir = lookup("LOCALES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::localization::default_locales_dir);

        let session_idle_secs =
            parse_var(&lookup, "SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;

        let defaults = SearchConfig::default();
        let search = SearchConfig {
            wikipedia_lang: lookup("WIKIPEDIA_LANG").unwrap_or(defaults.wikipedia_lang),
            api_url: lookup("WIKIPEDIA_API_URL").filter(|url| !url.trim().is_empty()),
            max_results: parse_var(&lookup, "SEARCH_MAX_RESULTS", defaults.max_results)?,
            timeout_secs: parse_var(&lookup, "SEARCH_TIMEOUT_SECS", defaults.timeout_secs)?,
            shortener_endpoint: lookup("SHORTENER_ENDPOINT")
                .unwrap_or(defaults.shortener_endpoint),
            shorten_links: parse_var(&lookup, "SHORTEN_LINKS", defaults.shorten_links)?,
            recovery: RecoveryConfig {
                circuit_breaker_threshold: parse_var(
                    &lookup,
                    "CIRCUIT_BREAKER_THRESHOLD",
                    defaults.recovery.circuit_breaker_threshold,
                )?,
                circuit_breaker_reset_secs: parse_var(
                    &lookup,
                    "CIRCUIT_BREAKER_RESET_SECS",
                    defaults.recovery.circuit_breaker_reset_secs,
                )?,
            },
        };

        Ok(Self {
            bot_token,
            database_url,
            locales_dir,
            session_idle_secs,
            search,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key} ({raw:?}): {e}")),
        None => Ok(default),
    }
}
