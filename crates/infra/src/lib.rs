//! Infrastructure layer: store adapters and configuration.
//!
//! The in-memory adapters back tests and local development; production
//! deployments plug their own implementations of the same traits.

pub mod audit_store;
pub mod config;
pub mod identity;
pub mod read_model;

pub use audit_store::InMemoryLogStore;
pub use config::{ConfigError, CoreConfig};
pub use identity::InMemoryCredentialStore;
pub use read_model::InMemoryTenantStore;
