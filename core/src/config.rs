//! Process-wide configuration loaded from the environment.
//!
//! # Design
//! Configuration is read once at startup. `Config::global` caches the first
//! successful load in a `OnceLock`; after that it never changes.
//! `Config::from_lookup` takes any key lookup so tests do not have to touch
//! the real environment.

use std::sync::OnceLock;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

pub const ENV_API_URL: &str = "TODO_SYNC_API_URL";
pub const ENV_BASE_ID: &str = "TODO_SYNC_BASE_ID";
pub const ENV_TABLE_NAME: &str = "TODO_SYNC_TABLE_NAME";
pub const ENV_TOKEN: &str = "TODO_SYNC_TOKEN";
pub const ENV_DEBOUNCE_MS: &str = "TODO_SYNC_DEBOUNCE_MS";

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// WHATWG path-segment percent-encode set.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub base_id: String,
    pub table_name: String,
    pub token: String,
    pub debounce: Duration,
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let debounce = match lookup(ENV_DEBOUNCE_MS) {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    key: ENV_DEBOUNCE_MS,
                    value: raw,
                })?,
            None => DEFAULT_DEBOUNCE,
        };

        Ok(Self {
            api_url: lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            base_id: required(ENV_BASE_ID)?,
            table_name: required(ENV_TABLE_NAME)?,
            token: required(ENV_TOKEN)?,
            debounce,
        })
    }

    /// Load from the environment on first call; return the cached value afterwards.
    pub fn global() -> Result<&'static Config, ConfigError> {
        if let Some(config) = GLOBAL.get() {
            return Ok(config);
        }
        let config = Self::from_env()?;
        Ok(GLOBAL.get_or_init(|| config))
    }

    /// `<api_url>/<base_id>/<table_name>`, with both segments percent-encoded.
    pub fn resource_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_url.trim_end_matches('/'),
            utf8_percent_encode(&self.base_id, PATH_SEGMENT),
            utf8_percent_encode(&self.table_name, PATH_SEGMENT)
        )
    }
}
