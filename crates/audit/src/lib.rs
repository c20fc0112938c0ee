//! `fleetdesk-audit`: append-only trail of administrative actions.
//!
//! Entries are written once through [`AuditLogService::log_action`] (or one of
//! its helpers) and are read-only afterwards: no exposed interface updates or
//! deletes them.

pub mod entry;
pub mod error;
pub mod query;
pub mod service;
pub mod store;

pub use entry::{ActionType, AuditLogEntry, Changes, NewAuditEntry};
pub use error::AuditError;
pub use query::{AuditLogFilter, LogStatistics, Pagination};
pub use service::{AuditLogService, LogActionRequest};
pub use store::LogStore;
