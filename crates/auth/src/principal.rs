use serde::{Deserialize, Serialize};

use fleetdesk_core::{ClientId, UserId};

/// Role carried by a principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalRole {
    Admin,
    Client,
}

impl PrincipalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalRole::Admin => "admin",
            PrincipalRole::Client => "client",
        }
    }

    /// Parse a role claim as issued by the identity provider.
    ///
    /// Unknown claims yield `None`; callers must treat that as an invalid token
    /// rather than defaulting to a role.
    pub fn from_claim(claim: &str) -> Option<Self> {
        match claim.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(PrincipalRole::Admin),
            "client" => Some(PrincipalRole::Client),
            _ => None,
        }
    }
}

impl core::fmt::Display for PrincipalRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity an operation runs as.
///
/// Only ever produced from validated identity claims (see
/// [`crate::claims::IdentityClaims::into_principal`]); request fields supplied
/// by the caller never feed into it. Lives for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Principal {
    Admin {
        user_id: UserId,
        email: String,
    },
    Client {
        user_id: UserId,
        /// Tenant the client acts for. `None` for a client account that has not
        /// been linked to a tenant yet.
        client_id: Option<ClientId>,
        email: String,
    },
}

impl Principal {
    pub fn user_id(&self) -> UserId {
        match self {
            Principal::Admin { user_id, .. } | Principal::Client { user_id, .. } => *user_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Admin { email, .. } | Principal::Client { email, .. } => email,
        }
    }

    pub fn role(&self) -> PrincipalRole {
        match self {
            Principal::Admin { .. } => PrincipalRole::Admin,
            Principal::Client { .. } => PrincipalRole::Client,
        }
    }

    /// Tenant association; always `None` for admins.
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            Principal::Admin { .. } => None,
            Principal::Client { client_id, .. } => *client_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin { .. })
    }
}
