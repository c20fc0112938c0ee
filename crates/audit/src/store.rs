use std::sync::Arc;

use fleetdesk_core::StoreError;

use crate::entry::{AuditLogEntry, NewAuditEntry};
use crate::query::AuditLogFilter;

/// Append-only audit log persistence.
///
/// There is no update or delete operation: nothing above this trait
/// can revise a written entry.
///
/// Implementations must:
/// - assign strictly increasing `sequence` numbers on append
/// - persist each entry atomically
/// - return copies from `scan`, never handles into stored state
pub trait LogStore: Send + Sync {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError>;

    /// All entries matching the field and date filters of `filter`, in any
    /// order. Pagination is applied by the caller.
    fn scan(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StoreError>;
}

impl<S> LogStore for Arc<S>
where
    S: LogStore + ?Sized,
{
    fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StoreError> {
        (**self).append(entry)
    }

    fn scan(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).scan(filter)
    }
}
