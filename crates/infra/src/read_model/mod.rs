//! Tenant state read by the authorization core.

pub mod tenant_store;

pub use tenant_store::InMemoryTenantStore;
