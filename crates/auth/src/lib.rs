//! `fleetdesk-auth`: pure authentication/authorization boundary.
//!
//! No HTTP or storage code lives here: stores are
//! traits injected by the caller, and every decision is returned as a value.

pub mod access;
pub mod claims;
pub mod error;
pub mod gate;
pub mod principal;
pub mod session;
pub mod tiers;

pub use access::{AccessDecision, AccessEvaluator, TenantTierStore};
pub use claims::{ClaimsError, IdentityClaims, validate_claims};
pub use error::{AuthError, INVALID_CREDENTIALS_MESSAGE};
pub use gate::{AuthorizationGate, GateDecision, Requirement};
pub use principal::{Principal, PrincipalRole};
pub use session::{
    CredentialStore, DEFAULT_SESSION_COOKIE, RequestContext, SessionState, SessionTokens, SessionValidator, SignInRejection,
    extract_credential, token_fingerprint,
};
pub use tiers::{Feature, FeatureSet, Tier, TierEntry, TierMatrix};
