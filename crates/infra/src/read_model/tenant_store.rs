use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use fleetdesk_auth::{TenantTierStore, Tier};
use fleetdesk_core::{ClientId, StoreError};

/// In-memory tenant tier store for tests/dev.
///
/// A single `RwLock` gives read-your-writes: once `set_tier` returns, every
/// later `current_tier` sees the new value.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    inner: RwLock<HashMap<ClientId, Tier>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a tenant entirely (tenant offboarding).
    pub fn remove(&self, client_id: ClientId) -> Result<Option<Tier>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(&client_id))
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TenantTierStore for InMemoryTenantStore {
    fn current_tier(&self, client_id: ClientId) -> Result<Option<Tier>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&client_id).cloned())
    }

    fn set_tier(&self, client_id: ClientId, tier: Tier) -> Result<Option<Tier>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let previous = map.insert(client_id, tier.clone());
        info!(
            client_id = %client_id,
            previous = previous.as_ref().map(|t| t.as_str()).unwrap_or("none"),
            tier = %tier,
            "client tier stored"
        );
        Ok(previous)
    }
}
