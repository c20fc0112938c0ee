use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetdesk_core::{ClientId, UserId};

use crate::{Principal, PrincipalRole};

/// Identity claims as resolved by the credential store (transport-agnostic).
///
/// This is the minimal set of claims FleetDesk expects once a session token
/// has been looked up by whatever identity provider is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    pub email: String,

    /// Raw role claim (`"admin"` or `"client"`).
    pub role: String,

    /// Tenant claim, present for tenant-scoped clients.
    pub client_id: Option<ClientId>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("unrecognised role claim")]
    UnknownRole,
}

/// Deterministically validate identity claims.
///
/// Note: this validates the *claims* only. Resolving the opaque token is the
/// credential store's job.
pub fn validate_claims(claims: &IdentityClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    if claims.expires_at <= claims.issued_at {
        return Err(ClaimsError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(ClaimsError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(ClaimsError::Expired);
    }
    if PrincipalRole::from_claim(&claims.role).is_none() {
        return Err(ClaimsError::UnknownRole);
    }
    Ok(())
}

impl IdentityClaims {
    /// Validate the claims and derive the principal they describe.
    ///
    /// An admin role claim discards any tenant claim: admins are never
    /// tenant-scoped.
    pub fn into_principal(self, now: DateTime<Utc>) -> Result<Principal, ClaimsError> {
        validate_claims(&self, now)?;
        let role = PrincipalRole::from_claim(&self.role).ok_or(ClaimsError::UnknownRole)?;
        Ok(match role {
            PrincipalRole::Admin => Principal::Admin {
                user_id: self.sub,
                email: self.email,
            },
            PrincipalRole::Client => Principal::Client {
                user_id: self.sub,
                client_id: self.client_id,
                email: self.email,
            },
        })
    }
}
