//! Request-boundary guard.
//!
//! Authentication and gating run here, before any handler logic, so handlers
//! only ever see a validated [`CallerContext`].

use tracing::debug;

use fleetdesk_auth::{
    AuthError, AuthorizationGate, CredentialStore, GateDecision, Requirement, RequestContext, SessionValidator,
    TenantTierStore,
};

use crate::context::CallerContext;

/// Authenticate a request without gating it.
pub fn authenticate<C>(validator: &SessionValidator<C>, request: &RequestContext) -> Result<CallerContext, GateDecision>
where
    C: CredentialStore,
{
    validator
        .authenticate(request)
        .map(|principal| CallerContext::from_request(principal, request))
        .map_err(auth_failure)
}

/// Authenticate a request and check `requirement` in one step.
///
/// The denial, if any, is the decision to return to the caller unchanged.
pub fn protect<C, S>(
    validator: &SessionValidator<C>,
    gate: &AuthorizationGate<S>,
    request: &RequestContext,
    requirement: &Requirement,
) -> Result<CallerContext, GateDecision>
where
    C: CredentialStore,
    S: TenantTierStore,
{
    let caller = authenticate(validator, request)?;
    let decision = gate.evaluate(Some(caller.principal()), requirement);
    if decision.is_allowed() {
        Ok(caller)
    } else {
        Err(decision)
    }
}

fn auth_failure(err: AuthError) -> GateDecision {
    debug!(code = %err.code(), "request not authenticated");
    GateDecision::deny(err.code(), err.to_string())
}
