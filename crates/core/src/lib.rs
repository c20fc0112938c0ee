//! `fleetdesk-core`: shared primitives for the authorization and audit core.
//!
//! This crate contains **pure** building blocks (no infrastructure concerns):
//! identifiers, the error-code taxonomy surfaced to callers, and the clock seam.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorCode, StoreError};
pub use id::{AuditLogId, ClientId, UserId};
