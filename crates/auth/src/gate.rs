//! Authorization gate: composable guard strategies over a principal.
//!
//! Each strategy is a pure decision over `(principal, matrix, tenant tier)`:
//! it returns a [`GateDecision`] and never raises. How a decision reaches the
//! caller (HTTP response, RPC status, ...) is the transport adapter's concern.
//!
//! - No panics
//! - One fresh tenant-store read per decision, no caching
//! - Admins bypass every feature and tier requirement

use serde::Serialize;
use tracing::{debug, error, warn};

use fleetdesk_core::{ClientId, ErrorCode, StoreError};

use crate::access::{AccessEvaluator, TenantTierStore};
use crate::tiers::{Feature, Tier, TierMatrix};
use crate::Principal;

/// What an operation demands of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Feature(Feature),
    AllOf(Vec<Feature>),
    AnyOf(Vec<Feature>),
    MinimumTier(Tier),
    AdminOnly,
}

/// Structured allow/deny outcome.
///
/// Denials carry enough context (feature(s), current and required tier) for a
/// call site to render an actionable upgrade prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<Feature>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    pub current_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_tier: Option<Tier>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            status: 200,
            code: None,
            message: "OK".to_string(),
            feature: None,
            features: Vec::new(),
            current_tier: None,
            required_tier: None,
        }
    }

    pub fn deny(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            status: code.status(),
            code: Some(code),
            message: message.into(),
            feature: None,
            features: Vec::new(),
            current_tier: None,
            required_tier: None,
        }
    }

    pub fn auth_required() -> Self {
        Self::deny(ErrorCode::AuthRequired, "Authentication required")
    }

    pub fn server_error() -> Self {
        Self::deny(ErrorCode::ServerError, "Internal server error")
    }

    fn with_feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    fn with_current_tier(mut self, tier: Option<Tier>) -> Self {
        self.current_tier = tier;
        self
    }

    fn with_required_tier(mut self, tier: Tier) -> Self {
        self.required_tier = Some(tier);
        self
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Who the gate is deciding for, once the role has been matched.
enum Subject {
    Admin,
    Tenant(ClientId),
}

fn tier_label(tier: Option<&Tier>) -> String {
    tier.map(|t| t.as_str().to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn join_features(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Guard strategies built on the [`AccessEvaluator`].
#[derive(Debug, Clone)]
pub struct AuthorizationGate<S> {
    evaluator: AccessEvaluator<S>,
}

impl<S: TenantTierStore> AuthorizationGate<S> {
    pub fn new(store: S, matrix: TierMatrix) -> Self {
        Self {
            evaluator: AccessEvaluator::new(store, matrix),
        }
    }

    pub fn from_evaluator(evaluator: AccessEvaluator<S>) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &AccessEvaluator<S> {
        &self.evaluator
    }

    /// Single entry point: evaluate any requirement for a (possibly absent)
    /// principal.
    pub fn evaluate(&self, principal: Option<&Principal>, requirement: &Requirement) -> GateDecision {
        let decision = match requirement {
            Requirement::Feature(feature) => self.require_feature(principal, *feature),
            Requirement::AllOf(features) => self.require_all_features(principal, features),
            Requirement::AnyOf(features) => self.require_any_feature(principal, features),
            Requirement::MinimumTier(tier) => self.require_minimum_tier(principal, tier),
            Requirement::AdminOnly => self.require_admin(principal),
        };

        if decision.allowed {
            debug!(?requirement, "access granted");
        } else {
            warn!(
                user_id = ?principal.map(|p| p.user_id()),
                code = ?decision.code,
                ?requirement,
                "access denied"
            );
        }
        decision
    }

    /// Gate on a single feature.
    pub fn require_feature(&self, principal: Option<&Principal>, feature: Feature) -> GateDecision {
        let client_id = match subject(principal) {
            Ok(Subject::Admin) => return GateDecision::allow(),
            Ok(Subject::Tenant(client_id)) => client_id,
            Err(denied) => return denied,
        };

        let tier = match self.fresh_tier(client_id) {
            Ok(tier) => tier,
            Err(denied) => return denied,
        };

        if self.has(tier.as_ref(), feature) {
            return GateDecision::allow().with_current_tier(tier);
        }

        let message = format!(
            "The '{}' feature is not included in your current '{}' tier. Upgrade your subscription to gain access.",
            feature,
            tier_label(tier.as_ref()),
        );
        GateDecision::deny(ErrorCode::AuthzTierUpgradeRequired, message)
            .with_feature(feature)
            .with_current_tier(tier)
    }

    /// Gate on every listed feature; the denial lists each missing one.
    pub fn require_all_features(&self, principal: Option<&Principal>, features: &[Feature]) -> GateDecision {
        let client_id = match subject(principal) {
            Ok(Subject::Admin) => return GateDecision::allow(),
            Ok(Subject::Tenant(client_id)) => client_id,
            Err(denied) => return denied,
        };

        let tier = match self.fresh_tier(client_id) {
            Ok(tier) => tier,
            Err(denied) => return denied,
        };

        let denied: Vec<Feature> = features
            .iter()
            .copied()
            .filter(|f| !self.has(tier.as_ref(), *f))
            .collect();

        if denied.is_empty() {
            return GateDecision::allow().with_current_tier(tier);
        }

        let message = format!(
            "Your current '{}' tier does not include: {}. Upgrade your subscription to gain access.",
            tier_label(tier.as_ref()),
            join_features(&denied),
        );
        GateDecision::deny(ErrorCode::AuthzTierUpgradeRequired, message)
            .with_features(denied)
            .with_current_tier(tier)
    }

    /// Gate on at least one of the listed features; the denial lists the full
    /// requested set.
    pub fn require_any_feature(&self, principal: Option<&Principal>, features: &[Feature]) -> GateDecision {
        let client_id = match subject(principal) {
            Ok(Subject::Admin) => return GateDecision::allow(),
            Ok(Subject::Tenant(client_id)) => client_id,
            Err(denied) => return denied,
        };

        let tier = match self.fresh_tier(client_id) {
            Ok(tier) => tier,
            Err(denied) => return denied,
        };

        if features.iter().any(|f| self.has(tier.as_ref(), *f)) {
            return GateDecision::allow().with_current_tier(tier);
        }

        let message = format!(
            "Your current '{}' tier does not include any of: {}. Upgrade your subscription to gain access.",
            tier_label(tier.as_ref()),
            join_features(features),
        );
        GateDecision::deny(ErrorCode::AuthzTierUpgradeRequired, message)
            .with_features(features.to_vec())
            .with_current_tier(tier)
    }

    /// Gate on tier rank. Ranks order tiers only; they say nothing about which
    /// features a tier carries.
    pub fn require_minimum_tier(&self, principal: Option<&Principal>, minimum: &Tier) -> GateDecision {
        let client_id = match subject(principal) {
            Ok(Subject::Admin) => return GateDecision::allow(),
            Ok(Subject::Tenant(client_id)) => client_id,
            Err(denied) => return denied,
        };

        let tier = match self.fresh_tier(client_id) {
            Ok(tier) => tier,
            Err(denied) => return denied,
        };

        let matrix = self.evaluator.matrix();
        let required_rank = matrix.tier_rank(minimum);
        if required_rank.is_none() {
            warn!(required_tier = %minimum, "minimum tier requirement names an unknown tier");
        }
        let current_rank = tier.as_ref().and_then(|t| matrix.tier_rank(t));

        if let (Some(current), Some(required)) = (current_rank, required_rank) {
            if current >= required {
                return GateDecision::allow().with_current_tier(tier);
            }
        }

        let message = format!(
            "This requires the '{}' tier or higher; your current tier is '{}'. Upgrade your subscription to gain access.",
            minimum,
            tier_label(tier.as_ref()),
        );
        GateDecision::deny(ErrorCode::AuthzTierUpgradeRequired, message)
            .with_current_tier(tier)
            .with_required_tier(minimum.clone())
    }

    /// Gate on the admin role.
    pub fn require_admin(&self, principal: Option<&Principal>) -> GateDecision {
        match principal {
            None => GateDecision::auth_required(),
            Some(Principal::Admin { .. }) => GateDecision::allow(),
            Some(Principal::Client { .. }) => {
                GateDecision::deny(ErrorCode::AuthzAdminOnly, "This action is restricted to administrators")
            }
        }
    }

    fn has(&self, tier: Option<&Tier>, feature: Feature) -> bool {
        tier.is_some_and(|t| self.evaluator.matrix().has_feature_access(t, feature))
    }

    fn fresh_tier(&self, client_id: ClientId) -> Result<Option<Tier>, GateDecision> {
        self.evaluator.resolve_tier(client_id).map_err(|e: StoreError| {
            error!(client_id = %client_id, error = %e, "tenant tier lookup failed during authorization");
            GateDecision::server_error()
        })
    }
}

fn subject(principal: Option<&Principal>) -> Result<Subject, GateDecision> {
    match principal {
        None => Err(GateDecision::auth_required()),
        Some(Principal::Admin { .. }) => Ok(Subject::Admin),
        Some(Principal::Client {
            client_id: Some(client_id),
            ..
        }) => Ok(Subject::Tenant(*client_id)),
        Some(Principal::Client { client_id: None, .. }) => Err(GateDecision::deny(
            ErrorCode::Forbidden,
            "Your account is not associated with a client",
        )),
    }
}
