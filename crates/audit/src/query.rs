//! Audit log query model: filters, pagination and aggregate statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetdesk_core::UserId;

use crate::entry::{ActionType, AuditLogEntry};

/// Pagination parameters for audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of entries to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self::bounded(limit, offset, Self::DEFAULT_LIMIT, Self::MAX_LIMIT)
    }

    /// Resolve optional caller values against configured bounds.
    pub fn bounded(limit: Option<u32>, offset: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).min(max_limit),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter criteria for audit queries. Every field is optional; an empty filter
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogFilter {
    pub admin_id: Option<UserId>,
    pub action_type: Option<ActionType>,
    pub target_table: Option<String>,
    pub target_id: Option<String>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditLogFilter {
    pub fn for_admin(admin_id: UserId) -> Self {
        Self {
            admin_id: Some(admin_id),
            ..Default::default()
        }
    }

    pub fn for_target(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            target_table: Some(table.into()),
            target_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Whether `entry` passes the field and date filters (pagination is not
    /// considered).
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if self.admin_id.is_some_and(|id| id != entry.admin_id) {
            return false;
        }
        if self.action_type.is_some_and(|a| a != entry.action_type) {
            return false;
        }
        if let Some(table) = &self.target_table {
            if *table != entry.target_table {
                return false;
            }
        }
        if let Some(id) = &self.target_id {
            if entry.target_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if self.from.is_some_and(|from| entry.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.timestamp > to) {
            return false;
        }
        true
    }
}

/// Aggregates over a filtered window of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStatistics {
    pub total: u64,
    pub by_action_type: BTreeMap<ActionType, u64>,
    pub by_admin: BTreeMap<UserId, u64>,
    pub distinct_admins: u64,
}

impl LogStatistics {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a AuditLogEntry>) -> Self {
        let mut stats = LogStatistics::default();
        for entry in entries {
            stats.total += 1;
            *stats.by_action_type.entry(entry.action_type).or_default() += 1;
            *stats.by_admin.entry(entry.admin_id).or_default() += 1;
        }
        stats.distinct_admins = stats.by_admin.len() as u64;
        stats
    }
}
