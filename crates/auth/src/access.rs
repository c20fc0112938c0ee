//! Tier access evaluation against the tenant store.
//!
//! The evaluator reads the tenant's tier fresh on every call. There is no
//! memoisation between it and the store: a tier change must be visible to the
//! very next evaluation for that tenant.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use fleetdesk_core::{ClientId, StoreError};

use crate::tiers::{Feature, Tier, TierMatrix};

/// Per-tenant tier storage (external persistence).
///
/// Implementations must provide read-your-writes consistency: once
/// `set_tier` returns, every subsequent `current_tier` observes the new value.
pub trait TenantTierStore: Send + Sync {
    /// Current tier of a tenant; `Ok(None)` when the tenant is unknown or has no
    /// tier assigned.
    fn current_tier(&self, client_id: ClientId) -> Result<Option<Tier>, StoreError>;

    /// Assign a tenant's tier, returning the tier it replaced. The read of the
    /// old value and the write of the new one are a single atomic swap. Only
    /// admin-facing client-management flows call this.
    fn set_tier(&self, client_id: ClientId, tier: Tier) -> Result<Option<Tier>, StoreError>;
}

impl<S> TenantTierStore for Arc<S>
where
    S: TenantTierStore + ?Sized,
{
    fn current_tier(&self, client_id: ClientId) -> Result<Option<Tier>, StoreError> {
        (**self).current_tier(client_id)
    }

    fn set_tier(&self, client_id: ClientId, tier: Tier) -> Result<Option<Tier>, StoreError> {
        (**self).set_tier(client_id, tier)
    }
}

/// Outcome of a single tenant/feature evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub tier: Option<Tier>,
    pub reason: String,
}

/// Answers "may this tenant use this feature right now?".
#[derive(Debug, Clone)]
pub struct AccessEvaluator<S> {
    store: S,
    matrix: TierMatrix,
}

impl<S: TenantTierStore> AccessEvaluator<S> {
    pub fn new(store: S, matrix: TierMatrix) -> Self {
        Self { store, matrix }
    }

    pub fn matrix(&self) -> &TierMatrix {
        &self.matrix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One fresh read of the tenant's tier, store failures included.
    pub fn resolve_tier(&self, client_id: ClientId) -> Result<Option<Tier>, StoreError> {
        self.store.current_tier(client_id)
    }

    /// The tenant's current tier, or `None` if it cannot be resolved.
    pub fn client_tier(&self, client_id: ClientId) -> Option<Tier> {
        match self.resolve_tier(client_id) {
            Ok(tier) => tier,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "tenant tier lookup failed");
                None
            }
        }
    }

    /// Whether the tenant may use `feature`. Never fails: an unresolvable tenant
    /// is simply denied.
    pub fn validate_tier_access(&self, client_id: ClientId, feature: Feature) -> bool {
        self.client_tier(client_id)
            .is_some_and(|tier| self.matrix.has_feature_access(&tier, feature))
    }

    /// Like [`Self::validate_tier_access`], with the tier and a reason attached.
    pub fn evaluate(&self, client_id: ClientId, feature: Feature) -> AccessDecision {
        let tier = match self.resolve_tier(client_id) {
            Ok(tier) => tier,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "tenant tier lookup failed");
                return AccessDecision {
                    granted: false,
                    tier: None,
                    reason: "tier could not be resolved".to_string(),
                };
            }
        };

        match tier {
            None => AccessDecision {
                granted: false,
                tier: None,
                reason: "client has no subscription tier".to_string(),
            },
            Some(tier) if self.matrix.has_feature_access(&tier, feature) => AccessDecision {
                granted: true,
                reason: format!("tier '{tier}' includes '{feature}'"),
                tier: Some(tier),
            },
            Some(tier) => AccessDecision {
                granted: false,
                reason: format!("tier '{tier}' does not include '{feature}'"),
                tier: Some(tier),
            },
        }
    }
}
