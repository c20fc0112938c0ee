//! Session validation: credential in, [`Principal`] (or a typed failure) out.
//!
//! Tokens are opaque here; the [`CredentialStore`] (identity provider) resolves
//! them to claims. Cleartext tokens never reach the logs, only a short
//! fingerprint does.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, warn};

use fleetdesk_core::{Clock, StoreError};

use crate::claims::IdentityClaims;
use crate::error::AuthError;
use crate::Principal;

/// Default name of the session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "fd_session";

/// Access/refresh token pair issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Why the identity provider turned a sign-in down.
///
/// The distinction exists for the provider's own bookkeeping; the session
/// validator collapses every variant except `Store` into one generic error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignInRejection {
    #[error("no account for that email")]
    UnknownAccount,

    #[error("password mismatch")]
    WrongPassword,

    #[error("account disabled")]
    Disabled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// External identity provider.
pub trait CredentialStore: Send + Sync {
    /// Resolve an access token to its claims; `Ok(None)` for unknown or revoked
    /// tokens.
    fn resolve(&self, access_token: &str) -> Result<Option<IdentityClaims>, StoreError>;

    /// Exchange a refresh token for a new pair; `Ok(None)` if it is unknown,
    /// used or expired.
    fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, StoreError>;

    fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, SignInRejection>;

    /// Revoke an access token. Unknown tokens are ignored.
    fn revoke(&self, access_token: &str) -> Result<(), StoreError>;
}

impl<C> CredentialStore for Arc<C>
where
    C: CredentialStore + ?Sized,
{
    fn resolve(&self, access_token: &str) -> Result<Option<IdentityClaims>, StoreError> {
        (**self).resolve(access_token)
    }

    fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, StoreError> {
        (**self).refresh(refresh_token)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, SignInRejection> {
        (**self).sign_in(email, password)
    }

    fn revoke(&self, access_token: &str) -> Result<(), StoreError> {
        (**self).revoke(access_token)
    }
}

/// Transport-neutral view of an inbound request: just the headers and cookies
/// the validator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Parse a raw `Cookie:` header (`a=1; b=2`) into the cookie jar.
    pub fn with_cookie_header(mut self, raw: &str) -> Self {
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Pull the credential out of a request.
///
/// Precedence: `Authorization: Bearer <token>` first, then the named session
/// cookie. An empty or non-bearer `Authorization` header counts as absent.
pub fn extract_credential(ctx: &RequestContext, cookie_name: &str) -> Option<String> {
    let bearer = ctx.header("authorization").and_then(|value| {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    });

    bearer.or_else(|| {
        ctx.cookie(cookie_name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Short, non-reversible token fingerprint for log correlation.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}

/// Turns credentials into principals.
pub struct SessionValidator<C> {
    store: C,
    clock: Arc<dyn Clock>,
    cookie_name: String,
}

impl<C: CredentialStore> SessionValidator<C> {
    pub fn new(store: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn extract_credential(&self, ctx: &RequestContext) -> Option<String> {
        extract_credential(ctx, &self.cookie_name)
    }

    /// Validate a credential and derive its principal.
    ///
    /// Malformed, unknown, revoked and expired tokens all produce the same
    /// [`AuthError::TokenInvalid`].
    pub fn validate(&self, credential: Option<&str>) -> Result<Principal, AuthError> {
        let token = match credential.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::TokenMissing),
        };
        let fingerprint = token_fingerprint(token);

        let claims = match self.store.resolve(token) {
            Ok(Some(claims)) => claims,
            Ok(None) => {
                warn!(token = %fingerprint, "session token did not resolve");
                return Err(AuthError::TokenInvalid);
            }
            Err(e) => {
                error!(token = %fingerprint, error = %e, "credential store failure");
                return Err(AuthError::ServerError);
            }
        };

        claims.into_principal(self.clock.now()).map_err(|e| {
            warn!(token = %fingerprint, reason = %e, "session claims rejected");
            AuthError::TokenInvalid
        })
    }

    /// Extract and validate in one step.
    pub fn authenticate(&self, ctx: &RequestContext) -> Result<Principal, AuthError> {
        let credential = self.extract_credential(ctx);
        self.validate(credential.as_deref())
    }

    /// Exchange a refresh token for a new pair. No retries.
    pub fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::SessionExpired);
        }
        match self.store.refresh(refresh_token.trim()) {
            Ok(Some(tokens)) => {
                debug!(token = %token_fingerprint(&tokens.access_token), "session refreshed");
                Ok(tokens)
            }
            Ok(None) => {
                warn!(token = %token_fingerprint(refresh_token), "refresh rejected");
                Err(AuthError::SessionExpired)
            }
            Err(e) => {
                error!(error = %e, "credential store failure during refresh");
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// Every credential-related rejection yields [`AuthError::InvalidCredentials`]
    /// so callers cannot learn which accounts exist.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        match self.store.sign_in(email.trim(), password) {
            Ok(tokens) => Ok(tokens),
            Err(SignInRejection::Store(e)) => {
                error!(error = %e, "credential store failure during sign-in");
                Err(AuthError::ServerError)
            }
            Err(_) => {
                warn!("sign-in rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.store.revoke(access_token).map_err(|e| {
            error!(error = %e, "credential store failure during sign-out");
            AuthError::ServerError
        })
    }
}

/// Ambient session for UI-adjacent callers.
///
/// Holds the current token pair; every read re-validates it, so a revoked or
/// expired session reads as signed out. Reads never fail.
pub struct SessionState<C> {
    validator: Arc<SessionValidator<C>>,
    tokens: RwLock<Option<SessionTokens>>,
}

impl<C: CredentialStore> SessionState<C> {
    pub fn new(validator: Arc<SessionValidator<C>>) -> Self {
        Self {
            validator,
            tokens: RwLock::new(None),
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let tokens = self.validator.sign_in(email, password)?;
        self.replace(Some(tokens));
        Ok(())
    }

    /// Refresh the held session. On failure the session is cleared.
    pub fn refresh(&self) -> Result<(), AuthError> {
        let refresh_token = self
            .snapshot()
            .map(|t| t.refresh_token)
            .ok_or(AuthError::SessionExpired)?;

        match self.validator.refresh(&refresh_token) {
            Ok(tokens) => {
                self.replace(Some(tokens));
                Ok(())
            }
            Err(e) => {
                self.replace(None);
                Err(e)
            }
        }
    }

    /// Forget the held session and revoke it upstream.
    ///
    /// The local session is cleared even when revocation fails; the error is
    /// returned so the caller knows the access token may still resolve until
    /// it expires.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        let held = self.snapshot();
        self.replace(None);
        match held {
            Some(tokens) => self.validator.sign_out(&tokens.access_token),
            None => Ok(()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_principal().is_some()
    }

    pub fn current_principal(&self) -> Option<Principal> {
        let tokens = self.snapshot()?;
        self.validator.validate(Some(tokens.access_token.as_str())).ok()
    }

    fn snapshot(&self) -> Option<SessionTokens> {
        self.tokens.read().ok().and_then(|t| t.clone())
    }

    fn replace(&self, tokens: Option<SessionTokens>) {
        if let Ok(mut slot) = self.tokens.write() {
            *slot = tokens;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Duration;
    use fleetdesk_core::{ClientId, FixedClock, UserId};

    use super::*;
    use crate::error::INVALID_CREDENTIALS_MESSAGE;

    #[derive(Default)]
    struct FakeIdentity {
        sessions: Mutex<HashMap<String, IdentityClaims>>,
        refreshes: Mutex<HashMap<String, SessionTokens>>,
        failing: bool,
        revoke_failing: bool,
    }

    impl CredentialStore for FakeIdentity {
        fn resolve(&self, access_token: &str) -> Result<Option<IdentityClaims>, StoreError> {
            if self.failing {
                return Err(StoreError::unavailable("idp down"));
            }
            Ok(self.sessions.lock().unwrap().get(access_token).cloned())
        }

        fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, StoreError> {
            Ok(self.refreshes.lock().unwrap().remove(refresh_token))
        }

        fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, SignInRejection> {
            match (email, password) {
                ("dispatch@acme.test", "correct horse") => Ok(SessionTokens {
                    access_token: "acc-1".to_string(),
                    refresh_token: "ref-1".to_string(),
                    expires_at: Utc::now() + Duration::hours(1),
                }),
                ("dispatch@acme.test", _) => Err(SignInRejection::WrongPassword),
                _ => Err(SignInRejection::UnknownAccount),
            }
        }

        fn revoke(&self, access_token: &str) -> Result<(), StoreError> {
            if self.revoke_failing {
                return Err(StoreError::unavailable("idp down"));
            }
            self.sessions.lock().unwrap().remove(access_token);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn claims(role: &str) -> IdentityClaims {
        IdentityClaims {
            sub: UserId::new(),
            email: "dispatch@acme.test".to_string(),
            role: role.to_string(),
            client_id: Some(ClientId::new()),
            issued_at: now() - Duration::minutes(5),
            expires_at: now() + Duration::minutes(55),
        }
    }

    fn validator(identity: FakeIdentity) -> SessionValidator<Arc<FakeIdentity>> {
        SessionValidator::new(Arc::new(identity), Arc::new(FixedClock(now())))
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let ctx = RequestContext::new()
            .with_header("Authorization", "Bearer from-header")
            .with_cookie(DEFAULT_SESSION_COOKIE, "from-cookie");
        assert_eq!(extract_credential(&ctx, DEFAULT_SESSION_COOKIE).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_used_when_header_absent() {
        let ctx = RequestContext::new().with_cookie_header("theme=dark; fd_session=abc123 ");
        assert_eq!(extract_credential(&ctx, DEFAULT_SESSION_COOKIE).as_deref(), Some("abc123"));
    }

    #[test]
    fn non_bearer_header_falls_through() {
        let ctx = RequestContext::new()
            .with_header("authorization", "Basic Zm9vOmJhcg==")
            .with_cookie(DEFAULT_SESSION_COOKIE, "cookie-token");
        assert_eq!(extract_credential(&ctx, DEFAULT_SESSION_COOKIE).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn nothing_present_yields_none() {
        let ctx = RequestContext::new().with_header("authorization", "Bearer   ");
        assert_eq!(extract_credential(&ctx, DEFAULT_SESSION_COOKIE), None);
    }

    #[test]
    fn missing_credential_is_token_missing() {
        let v = validator(FakeIdentity::default());
        assert_eq!(v.validate(None), Err(AuthError::TokenMissing));
        assert_eq!(v.validate(Some("  ")), Err(AuthError::TokenMissing));
        assert_eq!(v.authenticate(&RequestContext::new()), Err(AuthError::TokenMissing));
    }

    #[test]
    fn unknown_and_expired_tokens_look_the_same() {
        let identity = FakeIdentity::default();
        let mut expired = claims("client");
        expired.expires_at = now() - Duration::seconds(1);
        expired.issued_at = now() - Duration::hours(1);
        identity.sessions.lock().unwrap().insert("stale".to_string(), expired);
        let v = validator(identity);

        let unknown = v.validate(Some("nope")).unwrap_err();
        let stale = v.validate(Some("stale")).unwrap_err();
        assert_eq!(unknown, AuthError::TokenInvalid);
        assert_eq!(unknown.to_string(), stale.to_string());
        assert_eq!(unknown.status(), 401);
    }

    #[test]
    fn unknown_role_claim_is_invalid() {
        let identity = FakeIdentity::default();
        identity.sessions.lock().unwrap().insert("t".to_string(), claims("owner"));
        assert_eq!(validator(identity).validate(Some("t")), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn valid_token_yields_principal() {
        let identity = FakeIdentity::default();
        let c = claims("client");
        let expected_client = c.client_id;
        identity.sessions.lock().unwrap().insert("good".to_string(), c);
        let v = validator(identity);

        let ctx = RequestContext::new().with_header("Authorization", "Bearer good");
        let principal = v.authenticate(&ctx).unwrap();
        assert_eq!(principal.client_id(), expected_client);
        assert!(!principal.is_admin());
    }

    #[test]
    fn store_failure_is_a_server_error() {
        let identity = FakeIdentity {
            failing: true,
            ..Default::default()
        };
        assert_eq!(validator(identity).validate(Some("x")), Err(AuthError::ServerError));
    }

    #[test]
    fn failed_refresh_is_session_expired() {
        let v = validator(FakeIdentity::default());
        assert_eq!(v.refresh("unknown"), Err(AuthError::SessionExpired));
        assert_eq!(v.refresh(""), Err(AuthError::SessionExpired));
    }

    #[test]
    fn sign_in_errors_are_indistinguishable() {
        let v = validator(FakeIdentity::default());
        let wrong_password = v.sign_in("dispatch@acme.test", "hunter2").unwrap_err();
        let unknown_email = v.sign_in("foo@bar.com", "hunter2").unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(unknown_email.to_string(), INVALID_CREDENTIALS_MESSAGE);
        let msg = unknown_email.to_string().to_lowercase();
        assert!(!msg.contains("password"));
        assert!(!msg.contains("email"));
        assert!(!msg.contains("not found"));
    }

    #[test]
    fn ambient_state_reads_never_fail() {
        let identity = FakeIdentity::default();
        identity.sessions.lock().unwrap().insert("acc-1".to_string(), claims("admin"));
        let state = SessionState::new(Arc::new(validator(identity)));

        assert!(!state.is_authenticated());
        assert_eq!(state.current_principal(), None);

        state.sign_in("dispatch@acme.test", "correct horse").unwrap();
        assert!(state.is_authenticated());
        assert!(state.current_principal().unwrap().is_admin());

        state.sign_out().unwrap();
        assert!(!state.is_authenticated());
        assert_eq!(state.sign_out(), Ok(()));
    }

    #[test]
    fn failed_revocation_is_reported_and_still_clears_session() {
        let identity = FakeIdentity {
            revoke_failing: true,
            ..Default::default()
        };
        identity.sessions.lock().unwrap().insert("acc-1".to_string(), claims("client"));
        let state = SessionState::new(Arc::new(validator(identity)));
        state.sign_in("dispatch@acme.test", "correct horse").unwrap();
        assert!(state.is_authenticated());

        assert_eq!(state.sign_out(), Err(AuthError::ServerError));
        assert!(state.snapshot().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn failed_ambient_refresh_clears_session() {
        let identity = FakeIdentity::default();
        identity.sessions.lock().unwrap().insert("acc-1".to_string(), claims("client"));
        let state = SessionState::new(Arc::new(validator(identity)));
        state.sign_in("dispatch@acme.test", "correct horse").unwrap();

        assert_eq!(state.refresh(), Err(AuthError::SessionExpired));
        assert!(!state.is_authenticated());
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = token_fingerprint("secret-token");
        assert_eq!(a.len(), 8);
        assert_eq!(a, token_fingerprint("secret-token"));
        assert!(!a.contains("secret"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any credential the store does not know is rejected as
            /// missing or invalid, never accepted.
            #[test]
            fn unknown_credentials_never_authenticate(token in ".{0,64}") {
                let v = validator(FakeIdentity::default());
                let err = v.validate(Some(token.as_str())).unwrap_err();
                prop_assert!(matches!(err, AuthError::TokenMissing | AuthError::TokenInvalid));
                prop_assert_eq!(err.status(), 401);
            }

            /// Property: sign-in failures share one message whatever the input.
            #[test]
            fn sign_in_message_is_constant(email in "[a-z]{1,10}@[a-z]{1,8}\\.test", password in ".{1,32}") {
                prop_assume!(password != "correct horse");
                let v = validator(FakeIdentity::default());
                let err = v.sign_in(&email, &password).unwrap_err();
                prop_assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
            }
        }
    }
}
