//! Factory configuration.
//!
//! A [`Config`] is handed to a [`Registry`](crate::Registry) once, at
//! start-up, and applies to every resource registered there.
//!
//! # Environment
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `MILLPOND_MOCK` | use fixtures instead of real fetchers (`1/true/yes/on`, `0/false/no/off`) | off |
//! | `MILLPOND_STALE_AFTER_MS` | age in milliseconds after which a loaded value is refetched | never |
//!
//! # Examples
//!
//! ```
//! use millpond::Config;
//! use std::time::Duration;
//!
//! let config = Config::new()
//!     .with_mock(true)
//!     .with_stale_after(Duration::from_secs(30));
//!
//! assert!(config.mock());
//! assert_eq!(config.stale_after(), Some(Duration::from_secs(30)));
//! ```

use std::fmt;
use std::time::Duration;

/// Environment variable switching mock mode on.
pub const MOCK_ENV: &str = "MILLPOND_MOCK";

/// Environment variable setting the default freshness bound.
pub const STALE_AFTER_ENV: &str = "MILLPOND_STALE_AFTER_MS";

/// Settings shared by every resource in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    mock: bool,
    stale_after: Option<Duration>,
}

impl Config {
    /// Real fetchers, loaded values never go stale.
    pub fn new() -> Self {
        Config::default()
    }

    /// Read [`MOCK_ENV`] and [`STALE_AFTER_ENV`]. Unset variables keep their
    /// defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::new();

        if let Some(raw) = lookup(MOCK_ENV) {
            config.mock = parse_flag(&raw).ok_or_else(|| ConfigError::new(MOCK_ENV, &raw))?;
        }

        if let Some(raw) = lookup(STALE_AFTER_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::new(STALE_AFTER_ENV, &raw))?;
            config.stale_after = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }

    /// Turn mock mode on or off.
    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    /// Refetch loaded values older than `stale_after` on the next request.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }

    /// Whether fixtures replace real fetchers.
    pub fn mock(&self) -> bool {
        self.mock
    }

    /// Default freshness bound.
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// An environment variable held a value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    variable: &'static str,
    value: String,
}

impl ConfigError {
    fn new(variable: &'static str, value: &str) -> Self {
        ConfigError {
            variable,
            value: value.to_string(),
        }
    }

    /// Name of the offending variable.
    pub fn variable(&self) -> &'static str {
        self.variable
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value '{}' for {}", self.value, self.variable)
    }
}

impl std::error::Error for ConfigError {}
