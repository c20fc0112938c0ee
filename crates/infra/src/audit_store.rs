use std::sync::RwLock;

use fleetdesk_audit::{AuditLogEntry, AuditLogFilter, LogStore, NewAuditEntry};
use fleetdesk_core::StoreError;

/// In-memory append-only audit log.
///
/// Intended for tests/dev. Scans are linear.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for InMemoryLogStore {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;

        if entries.iter().any(|e| e.id == entry.id) {
            return Err(StoreError::conflict(format!("audit entry {} already exists", entry.id)));
        }

        let sequence = entries.last().map(|e| e.sequence).unwrap_or(0) + 1;
        let stored = AuditLogEntry::from_new(entry, sequence);
        entries.push(stored.clone());
        Ok(stored)
    }

    fn scan(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}
