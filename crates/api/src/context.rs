use fleetdesk_auth::{Principal, RequestContext};
use fleetdesk_core::{ClientId, UserId};

/// Caller context for one operation: the authenticated principal plus the
/// network origin recorded in audit entries.
///
/// Immutable once built; handlers receive it from [`crate::guard::protect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    principal: Principal,
    ip_address: Option<String>,
}

impl CallerContext {
    pub fn new(principal: Principal, ip_address: Option<String>) -> Self {
        Self { principal, ip_address }
    }

    /// Build from a request, taking the origin from `X-Forwarded-For` (first
    /// hop) or `X-Real-IP`.
    pub fn from_request(principal: Principal, request: &RequestContext) -> Self {
        Self::new(principal, client_ip(request))
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id()
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.principal.client_id()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}

fn client_ip(request: &RequestContext) -> Option<String> {
    let forwarded = request
        .header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| request.header("x-real-ip").map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Principal {
        Principal::Admin {
            user_id: UserId::new(),
            email: "ops@fleet.test".to_string(),
        }
    }

    #[test]
    fn first_forwarded_hop_wins() {
        let req = RequestContext::new()
            .with_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .with_header("X-Real-IP", "10.0.0.9");
        let ctx = CallerContext::from_request(admin(), &req);
        assert_eq!(ctx.ip_address(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let req = RequestContext::new().with_header("x-real-ip", " 10.0.0.9 ");
        assert_eq!(CallerContext::from_request(admin(), &req).ip_address(), Some("10.0.0.9"));
        assert_eq!(CallerContext::from_request(admin(), &RequestContext::new()).ip_address(), None);
    }
}
