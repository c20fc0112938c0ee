//! Error-code taxonomy shared by every component of the core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure kind surfaced to callers.
///
/// Each code carries an HTTP-equivalent status so transport adapters can map a
/// failure without knowing which component produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthTokenMissing,
    AuthTokenInvalid,
    AuthSessionExpired,
    AuthInvalidCredentials,
    AuthRequired,
    Forbidden,
    AuthzTierUpgradeRequired,
    AuthzAdminOnly,
    ValidationError,
    ServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthTokenMissing => "AUTH_TOKEN_MISSING",
            ErrorCode::AuthTokenInvalid => "AUTH_TOKEN_INVALID",
            ErrorCode::AuthSessionExpired => "AUTH_SESSION_EXPIRED",
            ErrorCode::AuthInvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::AuthzTierUpgradeRequired => "AUTHZ_TIER_UPGRADE_REQUIRED",
            ErrorCode::AuthzAdminOnly => "AUTHZ_ADMIN_ONLY",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ServerError => "SERVER_ERROR",
        }
    }

    /// HTTP-equivalent status for this code.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::AuthTokenMissing
            | ErrorCode::AuthTokenInvalid
            | ErrorCode::AuthSessionExpired
            | ErrorCode::AuthInvalidCredentials
            | ErrorCode::AuthRequired => 401,
            ErrorCode::Forbidden | ErrorCode::AuthzTierUpgradeRequired | ErrorCode::AuthzAdminOnly => 403,
            ErrorCode::ValidationError => 400,
            ErrorCode::ServerError => 500,
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an external store (tenant store, credential store, log store).
///
/// These are infrastructure failures. They are never shown to callers verbatim;
/// the core maps them to [`ErrorCode::ServerError`] and logs the detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::ServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_codes_are_401() {
        for code in [
            ErrorCode::AuthTokenMissing,
            ErrorCode::AuthTokenInvalid,
            ErrorCode::AuthSessionExpired,
            ErrorCode::AuthInvalidCredentials,
            ErrorCode::AuthRequired,
        ] {
            assert_eq!(code.status(), 401, "{code}");
        }
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&ErrorCode::AuthzTierUpgradeRequired).unwrap();
        assert_eq!(json, "\"AUTHZ_TIER_UPGRADE_REQUIRED\"");
        assert_eq!(ErrorCode::AuthzTierUpgradeRequired.as_str(), "AUTHZ_TIER_UPGRADE_REQUIRED");
    }

    #[test]
    fn store_errors_surface_as_server_error() {
        assert_eq!(StoreError::Poisoned.code(), ErrorCode::ServerError);
        assert_eq!(StoreError::Poisoned.code().status(), 500);
    }
}
