//! Runtime configuration, read from `FLEETDESK_*` environment variables.

use chrono::Duration;
use thiserror::Error;

use fleetdesk_audit::Pagination;
use fleetdesk_auth::DEFAULT_SESSION_COOKIE;

pub const ENV_SESSION_COOKIE: &str = "FLEETDESK_SESSION_COOKIE";
pub const ENV_SESSION_TTL_SECS: &str = "FLEETDESK_SESSION_TTL_SECS";
pub const ENV_REFRESH_TTL_SECS: &str = "FLEETDESK_REFRESH_TTL_SECS";
pub const ENV_AUDIT_DEFAULT_LIMIT: &str = "FLEETDESK_AUDIT_DEFAULT_LIMIT";
pub const ENV_AUDIT_MAX_LIMIT: &str = "FLEETDESK_AUDIT_MAX_LIMIT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("audit default limit {default} exceeds max limit {max}")]
    LimitOrder { default: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub session_cookie: String,
    /// Lifetime of issued access tokens.
    pub session_ttl: Duration,
    /// Lifetime of issued refresh tokens.
    pub refresh_ttl: Duration,
    pub audit_default_limit: u32,
    pub audit_max_limit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            session_ttl: Duration::seconds(3600),
            refresh_ttl: Duration::seconds(604_800),
            audit_default_limit: Pagination::DEFAULT_LIMIT,
            audit_max_limit: Pagination::MAX_LIMIT,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let session_cookie = match lookup(ENV_SESSION_COOKIE) {
            Some(v) if v.trim().is_empty() => return Err(ConfigError::Empty { key: ENV_SESSION_COOKIE }),
            Some(v) => v.trim().to_string(),
            None => defaults.session_cookie,
        };

        let session_ttl = match lookup(ENV_SESSION_TTL_SECS) {
            Some(v) => Duration::seconds(positive(ENV_SESSION_TTL_SECS, &v)?),
            None => defaults.session_ttl,
        };
        let refresh_ttl = match lookup(ENV_REFRESH_TTL_SECS) {
            Some(v) => Duration::seconds(positive(ENV_REFRESH_TTL_SECS, &v)?),
            None => defaults.refresh_ttl,
        };

        let audit_default_limit = match lookup(ENV_AUDIT_DEFAULT_LIMIT) {
            Some(v) => limit(ENV_AUDIT_DEFAULT_LIMIT, &v)?,
            None => defaults.audit_default_limit,
        };
        let audit_max_limit = match lookup(ENV_AUDIT_MAX_LIMIT) {
            Some(v) => limit(ENV_AUDIT_MAX_LIMIT, &v)?,
            None => defaults.audit_max_limit,
        };
        if audit_default_limit > audit_max_limit {
            return Err(ConfigError::LimitOrder {
                default: audit_default_limit,
                max: audit_max_limit,
            });
        }

        Ok(Self {
            session_cookie,
            session_ttl,
            refresh_ttl,
            audit_default_limit,
            audit_max_limit,
        })
    }
}

fn positive(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}

fn limit(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}
