use thiserror::Error;

use fleetdesk_core::{ErrorCode, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The write was malformed (missing field, unknown action type).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The log store failed. Details are logged, not displayed.
    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl AuditError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AuditError::Validation(_) => ErrorCode::ValidationError,
            AuditError::Store(_) => ErrorCode::ServerError,
        }
    }

    pub fn status(&self) -> u16 {
        self.code().status()
    }
}
