//! Service wiring.

use std::sync::Arc;

use tracing::info;

use fleetdesk_audit::AuditLogService;
use fleetdesk_auth::{
    AuthorizationGate, GateDecision, Requirement, RequestContext, SessionState, SessionValidator, TierMatrix,
};
use fleetdesk_core::{ClientId, Clock, SystemClock};
use fleetdesk_infra::{ConfigError, CoreConfig, InMemoryCredentialStore, InMemoryLogStore, InMemoryTenantStore};

use crate::admin::{AdminError, TierChange, change_client_tier};
use crate::context::CallerContext;
use crate::guard;

pub type Validator = SessionValidator<Arc<InMemoryCredentialStore>>;
pub type Gate = AuthorizationGate<Arc<InMemoryTenantStore>>;
pub type AuditLog = AuditLogService<Arc<InMemoryLogStore>>;

/// Everything a request handler needs, built once per process.
pub struct AppServices {
    pub config: CoreConfig,
    pub identity: Arc<InMemoryCredentialStore>,
    pub tenants: Arc<InMemoryTenantStore>,
    pub validator: Arc<Validator>,
    pub gate: Gate,
    pub audit: AuditLog,
}

impl AppServices {
    /// Initialize logging, read configuration and wire in-memory stores.
    pub fn from_env() -> Result<Self, ConfigError> {
        fleetdesk_observability::init();
        let config = CoreConfig::from_env()?;
        Ok(build_in_memory_services(config, Arc::new(SystemClock)))
    }

    pub fn protect(&self, request: &RequestContext, requirement: &Requirement) -> Result<CallerContext, GateDecision> {
        guard::protect(&self.validator, &self.gate, request, requirement)
    }

    pub fn change_client_tier(
        &self,
        caller: &CallerContext,
        client_id: ClientId,
        tier: &str,
    ) -> Result<TierChange, AdminError> {
        change_client_tier(&self.gate, &self.audit, caller, client_id, tier)
    }

    /// A fresh signed-out session sharing this process's validator.
    pub fn session(&self) -> SessionState<Arc<InMemoryCredentialStore>> {
        SessionState::new(self.validator.clone())
    }
}

/// In-memory wiring (dev/test) with the standard tier matrix.
pub fn build_in_memory_services(config: CoreConfig, clock: Arc<dyn Clock>) -> AppServices {
    let identity = Arc::new(InMemoryCredentialStore::from_config(clock.clone(), &config));
    let tenants = Arc::new(InMemoryTenantStore::new());
    let log_store = Arc::new(InMemoryLogStore::new());

    let validator = Arc::new(
        SessionValidator::new(identity.clone(), clock.clone()).with_cookie_name(config.session_cookie.clone()),
    );
    let gate = AuthorizationGate::new(tenants.clone(), TierMatrix::standard());
    let audit = AuditLogService::new(log_store, clock).with_limits(config.audit_default_limit, config.audit_max_limit);

    info!(cookie = %config.session_cookie, "in-memory services ready");

    AppServices {
        config,
        identity,
        tenants,
        validator,
        gate,
        audit,
    }
}
