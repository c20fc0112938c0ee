//! Authentication error model.

use thiserror::Error;

use fleetdesk_core::ErrorCode;

/// Message returned for every failed sign-in, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Authentication failure.
///
/// Display strings are what callers see, so they stay generic: they never say
/// whether a token was unknown, malformed, revoked or expired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    TokenMissing,

    #[error("Invalid or expired session")]
    TokenInvalid,

    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Internal server error")]
    ServerError,
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::TokenMissing => ErrorCode::AuthTokenMissing,
            AuthError::TokenInvalid => ErrorCode::AuthTokenInvalid,
            AuthError::SessionExpired => ErrorCode::AuthSessionExpired,
            AuthError::InvalidCredentials => ErrorCode::AuthInvalidCredentials,
            AuthError::ServerError => ErrorCode::ServerError,
        }
    }

    pub fn status(&self) -> u16 {
        self.code().status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_message_is_the_shared_constant() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[test]
    fn token_failures_are_401() {
        assert_eq!(AuthError::TokenMissing.status(), 401);
        assert_eq!(AuthError::TokenInvalid.status(), 401);
        assert_eq!(AuthError::SessionExpired.status(), 401);
        assert_eq!(AuthError::ServerError.status(), 500);
    }
}
