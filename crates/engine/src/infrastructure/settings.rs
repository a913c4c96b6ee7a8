//! Engine configuration.
//!
//! Loaded from environment variables, with `.env` support. Every value has a
//! default; an unparseable value falls back to its default with a warning.

use std::str::FromStr;
use std::time::Duration;

/// Quiet period before a sheet edit is written.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Default table name for character rows.
pub const DEFAULT_TABLE: &str = "characters";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Debounce window for sheet writes (`CHARSHEET_DEBOUNCE_MS`).
    pub debounce: Duration,
    /// Hosted store base URL (`CHARSHEET_STORE_URL`). `None` selects the
    /// in-memory adapters.
    pub store_url: Option<String>,
    /// Public API key sent with every hosted call (`CHARSHEET_STORE_KEY`).
    pub store_key: Option<String>,
    /// Table holding character rows (`CHARSHEET_TABLE`).
    pub table: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            store_url: None,
            store_key: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from the process environment after reading `.env`, if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            debounce: Duration::from_millis(parse_or(
                "CHARSHEET_DEBOUNCE_MS",
                non_empty("CHARSHEET_DEBOUNCE_MS"),
                DEFAULT_DEBOUNCE_MS,
            )),
            store_url: non_empty("CHARSHEET_STORE_URL"),
            store_key: non_empty("CHARSHEET_STORE_KEY"),
            table: non_empty("CHARSHEET_TABLE").unwrap_or(defaults.table),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(
                key,
                value = %raw,
                default = %default,
                "Invalid config value, using default"
            );
            default
        }),
    }
}
