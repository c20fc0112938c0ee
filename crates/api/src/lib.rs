//! Request boundary: authentication, gating and admin flows, independent of
//! any HTTP framework.

pub mod admin;
pub mod app;
pub mod context;
pub mod guard;

pub use admin::{AdminError, TierChange, change_client_tier};
pub use app::{AppServices, build_in_memory_services};
pub use context::CallerContext;
pub use guard::{authenticate, protect};
