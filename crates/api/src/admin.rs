//! Administrative flows that change tenant state.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use fleetdesk_audit::{AuditError, AuditLogEntry, AuditLogService, LogStore};
use fleetdesk_auth::{AuthorizationGate, GateDecision, TenantTierStore, Tier};
use fleetdesk_core::{ClientId, ErrorCode, StoreError};

use crate::context::CallerContext;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdminError {
    #[error("{}", .0.message)]
    Denied(GateDecision),

    #[error("unknown tier '{0}'")]
    UnknownTier(String),

    #[error("Internal server error")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl AdminError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AdminError::Denied(decision) => decision.code.unwrap_or(ErrorCode::Forbidden),
            AdminError::UnknownTier(_) => ErrorCode::ValidationError,
            AdminError::Store(_) => ErrorCode::ServerError,
            AdminError::Audit(e) => e.code(),
        }
    }

    pub fn status(&self) -> u16 {
        self.code().status()
    }
}

/// Outcome of a tier change, including the audit record it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierChange {
    pub client_id: ClientId,
    pub previous_tier: Option<Tier>,
    pub tier: Tier,
    pub audit_entry: AuditLogEntry,
}

/// Move a client to another tier and record `tier_updated`.
///
/// The caller must be an admin and the tier must exist in the gate's matrix.
/// The new tier is visible to the very next access check. If the audit write
/// fails afterwards the tier stays applied and the error is returned.
pub fn change_client_tier<S, L>(
    gate: &AuthorizationGate<S>,
    audit: &AuditLogService<L>,
    caller: &CallerContext,
    client_id: ClientId,
    tier: &str,
) -> Result<TierChange, AdminError>
where
    S: TenantTierStore,
    L: LogStore,
{
    let decision = gate.require_admin(Some(caller.principal()));
    if !decision.is_allowed() {
        return Err(AdminError::Denied(decision));
    }

    let tier = Tier::new(tier.trim().to_ascii_lowercase());
    let evaluator = gate.evaluator();
    if !evaluator.matrix().is_known(&tier) {
        return Err(AdminError::UnknownTier(tier.as_str().to_string()));
    }

    // The before-snapshot is the tier this swap replaced, not an earlier read.
    let previous_tier = evaluator.store().set_tier(client_id, tier.clone()).map_err(|e| {
        error!(client_id = %client_id, error = %e, "tier write failed");
        e
    })?;

    let audit_entry = audit
        .log_tier_updated(
            caller.user_id(),
            client_id,
            previous_tier.as_ref().map(Tier::as_str),
            tier.as_str(),
            caller.ip_address(),
        )
        .map_err(|e| {
            error!(client_id = %client_id, tier = %tier, error = %e, "tier applied but audit write failed");
            e
        })?;

    info!(
        admin_id = %caller.user_id(),
        client_id = %client_id,
        tier = %tier,
        "client tier changed"
    );

    Ok(TierChange {
        client_id,
        previous_tier,
        tier,
        audit_entry,
    })
}
