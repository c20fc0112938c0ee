//! In-memory identity provider.
//!
//! Stands in for the external credential service in tests and local runs.
//! Passwords are stored as argon2id PHC strings with a per-account random
//! salt; tokens are opaque random strings. Expired sessions and refresh grants
//! are pruned whenever a new pair is issued.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use fleetdesk_auth::{CredentialStore, IdentityClaims, PrincipalRole, SessionTokens, SignInRejection, token_fingerprint};
use fleetdesk_core::{Clock, ClientId, StoreError, UserId};

use crate::config::CoreConfig;

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    email: String,
    password_hash: String,
    role: PrincipalRole,
    client_id: Option<ClientId>,
    active: bool,
}

#[derive(Debug, Clone)]
struct RefreshGrant {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, IdentityClaims>,
    refresh: HashMap<String, RefreshGrant>,
}

impl State {
    fn account_by_id(&self, user_id: UserId) -> Option<&Account> {
        self.accounts.values().find(|a| a.user_id == user_id)
    }
}

pub struct InMemoryCredentialStore {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    refresh_ttl: Duration,
    /// Verified against on unknown-account sign-ins so they cost the same as a wrong password.
    dummy_hash: Option<String>,
}

impl InMemoryCredentialStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_config(clock, &CoreConfig::default())
    }

    pub fn from_config(clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
            session_ttl: config.session_ttl,
            refresh_ttl: config.refresh_ttl,
            dummy_hash: hash_password("fleetdesk-unknown-account").ok(),
        }
    }

    /// Create an account. Admin accounts never carry a tenant.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        role: PrincipalRole,
        client_id: Option<ClientId>,
    ) -> Result<UserId, StoreError> {
        let key = normalize_email(email);
        let password_hash = hash_password(password)?;
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        if state.accounts.contains_key(&key) {
            return Err(StoreError::conflict(format!("account {key} already exists")));
        }

        let user_id = UserId::new();
        let client_id = match role {
            PrincipalRole::Admin => None,
            PrincipalRole::Client => client_id,
        };
        state.accounts.insert(
            key.clone(),
            Account {
                user_id,
                email: key,
                password_hash,
                role,
                client_id,
                active: true,
            },
        );
        info!(user_id = %user_id, role = role.as_str(), "account registered");
        Ok(user_id)
    }

    /// Disable an account and drop every session it holds.
    pub fn deactivate(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let Some(account) = state.accounts.values_mut().find(|a| a.user_id == user_id) else {
            return Ok(());
        };
        account.active = false;
        state.sessions.retain(|_, c| c.sub != user_id);
        state.refresh.retain(|_, g| g.user_id != user_id);
        info!(user_id = %user_id, "account deactivated");
        Ok(())
    }

    /// Issue a token pair without a password check (seeding, tests).
    pub fn issue_for(&self, user_id: UserId) -> Result<Option<SessionTokens>, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let Some(account) = state.account_by_id(user_id).filter(|a| a.active).cloned() else {
            return Ok(None);
        };
        Ok(Some(self.issue(&mut state, &account)))
    }

    fn issue(&self, state: &mut State, account: &Account) -> SessionTokens {
        let now = self.clock.now();
        state.sessions.retain(|_, c| c.expires_at > now);
        state.refresh.retain(|_, g| g.expires_at > now);
        let access_token = new_token();
        let refresh_token = new_token();
        let expires_at = now + self.session_ttl;

        state.sessions.insert(
            access_token.clone(),
            IdentityClaims {
                sub: account.user_id,
                email: account.email.clone(),
                role: account.role.as_str().to_string(),
                client_id: account.client_id,
                issued_at: now,
                expires_at,
            },
        );
        state.refresh.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id: account.user_id,
                expires_at: now + self.refresh_ttl,
            },
        );
        debug!(user_id = %account.user_id, token = %token_fingerprint(&access_token), "session issued");

        SessionTokens {
            access_token,
            refresh_token,
            expires_at,
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn resolve(&self, access_token: &str) -> Result<Option<IdentityClaims>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.sessions.get(access_token).cloned())
    }

    fn refresh(&self, refresh_token: &str) -> Result<Option<SessionTokens>, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        // Refresh tokens are single use.
        let Some(grant) = state.refresh.remove(refresh_token) else {
            return Ok(None);
        };
        if grant.expires_at <= self.clock.now() {
            return Ok(None);
        }
        let Some(account) = state.account_by_id(grant.user_id).filter(|a| a.active).cloned() else {
            return Ok(None);
        };
        Ok(Some(self.issue(&mut state, &account)))
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, SignInRejection> {
        let found = {
            let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
            state.accounts.get(&normalize_email(email)).cloned()
        };
        let Some(account) = found else {
            if let Some(dummy) = &self.dummy_hash {
                let _ = verify_password(dummy, password);
            }
            return Err(SignInRejection::UnknownAccount);
        };
        if !verify_password(&account.password_hash, password) {
            return Err(SignInRejection::WrongPassword);
        }
        if !account.active {
            return Err(SignInRejection::Disabled);
        }

        // The hash is checked outside the lock; the account may have been disabled meanwhile.
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let still_active = state.account_by_id(account.user_id).is_some_and(|a| a.active);
        if !still_active {
            return Err(SignInRejection::Disabled);
        }
        Ok(self.issue(&mut state, &account))
    }

    fn revoke(&self, access_token: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.sessions.remove(access_token);
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::unavailable(format!("password hashing failed: {e}")))
}

fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

fn new_token() -> String {
    format!("fd_{}", Uuid::now_v7().simple())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fleetdesk_core::FixedClock;

    use super::*;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn store_at(now: DateTime<Utc>) -> InMemoryCredentialStore {
        InMemoryCredentialStore::new(Arc::new(FixedClock(now)))
    }

    fn live_entries(store: &InMemoryCredentialStore) -> (usize, usize) {
        let state = store.state.read().unwrap();
        (state.sessions.len(), state.refresh.len())
    }

    #[test]
    fn sign_in_issues_resolvable_tokens() {
        let now = Utc::now();
        let store = store_at(now);
        let client = ClientId::new();
        let user = store
            .register("Driver@Fleet.test", "hunter2", PrincipalRole::Client, Some(client))
            .unwrap();

        let tokens = store.sign_in("driver@fleet.test", "hunter2").unwrap();
        assert!(tokens.access_token.starts_with("fd_"));
        assert_eq!(tokens.expires_at, now + Duration::seconds(3600));

        let claims = store.resolve(&tokens.access_token).unwrap().unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, "client");
        assert_eq!(claims.client_id, Some(client));
    }

    #[test]
    fn admins_never_carry_a_tenant() {
        let store = store_at(Utc::now());
        let user = store
            .register("ops@fleet.test", "pw", PrincipalRole::Admin, Some(ClientId::new()))
            .unwrap();
        let tokens = store.issue_for(user).unwrap().unwrap();
        let claims = store.resolve(&tokens.access_token).unwrap().unwrap();
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.client_id, None);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let store = store_at(Utc::now());
        store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();
        let err = store.register(" A@FLEET.TEST ", "pw", PrincipalRole::Admin, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn sign_in_rejections() {
        let store = store_at(Utc::now());
        let user = store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();

        assert_eq!(store.sign_in("foo@bar.com", "pw"), Err(SignInRejection::UnknownAccount));
        assert_eq!(store.sign_in("a@fleet.test", "nope"), Err(SignInRejection::WrongPassword));

        store.deactivate(user).unwrap();
        assert_eq!(store.sign_in("a@fleet.test", "pw"), Err(SignInRejection::Disabled));
    }

    #[test]
    fn refresh_tokens_are_single_use() {
        let store = store_at(Utc::now());
        store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();
        let tokens = store.sign_in("a@fleet.test", "pw").unwrap();

        let renewed = store.refresh(&tokens.refresh_token).unwrap().unwrap();
        assert_ne!(renewed.access_token, tokens.access_token);
        assert_eq!(store.refresh(&tokens.refresh_token).unwrap(), None);
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let store = InMemoryCredentialStore::from_config(
            Arc::new(FixedClock(Utc::now())),
            &CoreConfig {
                refresh_ttl: Duration::seconds(0),
                ..CoreConfig::default()
            },
        );
        store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();
        let tokens = store.sign_in("a@fleet.test", "pw").unwrap();
        assert_eq!(store.refresh(&tokens.refresh_token).unwrap(), None);
    }

    #[test]
    fn revoke_and_deactivate_drop_sessions() {
        let store = store_at(Utc::now());
        let user = store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();

        let first = store.sign_in("a@fleet.test", "pw").unwrap();
        store.revoke(&first.access_token).unwrap();
        assert_eq!(store.resolve(&first.access_token).unwrap(), None);

        let second = store.sign_in("a@fleet.test", "pw").unwrap();
        store.deactivate(user).unwrap();
        assert_eq!(store.resolve(&second.access_token).unwrap(), None);
        assert_eq!(store.refresh(&second.refresh_token).unwrap(), None);
        assert_eq!(store.issue_for(user).unwrap(), None);
    }

    #[test]
    fn passwords_are_stored_as_salted_argon2() {
        let store = store_at(Utc::now());
        store.register("a@fleet.test", "hunter2", PrincipalRole::Admin, None).unwrap();
        store.register("b@fleet.test", "hunter2", PrincipalRole::Admin, None).unwrap();

        let state = store.state.read().unwrap();
        let a = &state.accounts["a@fleet.test"].password_hash;
        let b = &state.accounts["b@fleet.test"].password_hash;
        assert!(a.starts_with("$argon2id$"));
        assert!(!a.contains("hunter2"));
        assert_ne!(a, b);
        assert!(verify_password(a, "hunter2"));
        assert!(!verify_password(a, "hunter3"));
        assert!(!verify_password("not-a-phc-string", "hunter2"));
    }

    #[test]
    fn unknown_account_still_runs_a_verification() {
        let store = store_at(Utc::now());
        let dummy = store.dummy_hash.as_deref().unwrap();
        assert!(dummy.starts_with("$argon2id$"));
        assert_eq!(store.sign_in("ghost@fleet.test", "pw"), Err(SignInRejection::UnknownAccount));
    }

    #[test]
    fn expired_entries_are_pruned_on_issue() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let store = InMemoryCredentialStore::new(clock.clone());
        store.register("a@fleet.test", "pw", PrincipalRole::Admin, None).unwrap();

        let first = store.sign_in("a@fleet.test", "pw").unwrap();
        store.sign_in("a@fleet.test", "pw").unwrap();
        assert_eq!(live_entries(&store), (2, 2));

        // Past the session lifetime but inside the refresh lifetime.
        *clock.0.lock().unwrap() += Duration::seconds(3601);
        let third = store.sign_in("a@fleet.test", "pw").unwrap();
        assert_eq!(live_entries(&store), (1, 3));
        assert_eq!(store.resolve(&first.access_token).unwrap(), None);

        *clock.0.lock().unwrap() += Duration::days(31);
        store.sign_in("a@fleet.test", "pw").unwrap();
        assert_eq!(live_entries(&store), (1, 1));
        assert_eq!(store.refresh(&third.refresh_token).unwrap(), None);
    }
}
