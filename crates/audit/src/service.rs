//! Audit log service: validated appends, ordered queries, statistics.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::{error, info};

use fleetdesk_core::{AuditLogId, ClientId, Clock, UserId};

use crate::entry::{ActionType, AuditLogEntry, Changes, NewAuditEntry};
use crate::error::AuditError;
use crate::query::{AuditLogFilter, LogStatistics, Pagination};
use crate::store::LogStore;

const CLIENTS_TABLE: &str = "clients";
const DOCUMENTS_TABLE: &str = "documents";
const TICKETS_TABLE: &str = "support_tickets";

/// Raw write request, as assembled by a call site.
///
/// Fields are loosely typed; [`AuditLogService::log_action`] rejects anything
/// missing or outside the known action types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogActionRequest {
    pub admin_id: Option<UserId>,
    pub action_type: String,
    pub target_table: String,
    pub target_id: Option<String>,
    #[serde(default)]
    pub changes: Changes,
    pub ip_address: Option<String>,
}

impl LogActionRequest {
    pub fn new(admin_id: UserId, action_type: ActionType, target_table: impl Into<String>) -> Self {
        Self {
            admin_id: Some(admin_id),
            action_type: action_type.as_str().to_string(),
            target_table: target_table.into(),
            ..Default::default()
        }
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn changes(mut self, changes: Changes) -> Self {
        self.changes = changes;
        self
    }

    pub fn ip(mut self, ip_address: Option<&str>) -> Self {
        self.ip_address = ip_address.map(str::to_string);
        self
    }
}

pub struct AuditLogService<L> {
    store: L,
    clock: Arc<dyn Clock>,
    default_limit: u32,
    max_limit: u32,
}

impl<L: LogStore> AuditLogService<L> {
    pub fn new(store: L, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            default_limit: Pagination::DEFAULT_LIMIT,
            max_limit: Pagination::MAX_LIMIT,
        }
    }

    /// Override the page-size bounds (see `CoreConfig`).
    pub fn with_limits(mut self, default_limit: u32, max_limit: u32) -> Self {
        self.max_limit = max_limit.max(1);
        self.default_limit = default_limit.clamp(1, self.max_limit);
        self
    }

    /// Validate and append one entry.
    pub fn log_action(&self, request: LogActionRequest) -> Result<AuditLogEntry, AuditError> {
        let admin_id = request
            .admin_id
            .ok_or_else(|| AuditError::validation("admin_id is required"))?;

        let action = request.action_type.trim();
        if action.is_empty() {
            return Err(AuditError::validation("action_type is required"));
        }
        let action_type: ActionType = action.parse().map_err(AuditError::Validation)?;

        let target_table = request.target_table.trim();
        if target_table.is_empty() {
            return Err(AuditError::validation("target_table is required"));
        }

        let entry = NewAuditEntry {
            id: AuditLogId::new(),
            admin_id,
            action_type,
            target_table: target_table.to_string(),
            target_id: request.target_id.filter(|id| !id.trim().is_empty()),
            changes: request.changes,
            ip_address: request.ip_address,
            timestamp: self.clock.now(),
        };

        let stored = self.store.append(entry).map_err(|e| {
            error!(error = %e, action = %action_type, "audit log append failed");
            AuditError::from(e)
        })?;

        info!(
            audit_id = %stored.id,
            sequence = stored.sequence,
            admin_id = %stored.admin_id,
            action = %stored.action_type,
            target_table = %stored.target_table,
            "audit entry recorded"
        );
        Ok(stored)
    }

    /// Filtered, paginated query, most recent first.
    pub fn query_logs(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut entries = self.scan(filter)?;
        sort_most_recent_first(&mut entries);

        let page = Pagination::bounded(filter.limit, filter.offset, self.default_limit, self.max_limit);
        Ok(entries
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    pub fn logs_for_target(&self, table: &str, id: &str) -> Result<Vec<AuditLogEntry>, AuditError> {
        self.query_logs(&AuditLogFilter::for_target(table, id))
    }

    pub fn logs_for_admin(&self, admin_id: UserId, limit: Option<u32>) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut filter = AuditLogFilter::for_admin(admin_id);
        filter.limit = limit;
        self.query_logs(&filter)
    }

    pub fn recent_logs(&self, limit: Option<u32>) -> Result<Vec<AuditLogEntry>, AuditError> {
        self.query_logs(&AuditLogFilter {
            limit,
            ..Default::default()
        })
    }

    /// Aggregates over every entry matching the filter (pagination ignored).
    pub fn log_statistics(&self, filter: &AuditLogFilter) -> Result<LogStatistics, AuditError> {
        let entries = self.scan(filter)?;
        Ok(LogStatistics::from_entries(&entries))
    }

    pub fn log_client_created(
        &self,
        admin_id: UserId,
        client_id: ClientId,
        client: JsonValue,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry, AuditError> {
        self.log_action(
            LogActionRequest::new(admin_id, ActionType::ClientCreated, CLIENTS_TABLE)
                .target(client_id.to_string())
                .changes(Changes::created(client))
                .ip(ip_address),
        )
    }

    pub fn log_client_updated(
        &self,
        admin_id: UserId,
        client_id: ClientId,
        before: JsonValue,
        after: JsonValue,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry, AuditError> {
        self.log_action(
            LogActionRequest::new(admin_id, ActionType::ClientUpdated, CLIENTS_TABLE)
                .target(client_id.to_string())
                .changes(Changes::updated(before, after))
                .ip(ip_address),
        )
    }

    pub fn log_document_deleted(
        &self,
        admin_id: UserId,
        document_id: &str,
        document: JsonValue,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry, AuditError> {
        self.log_action(
            LogActionRequest::new(admin_id, ActionType::DocumentDeleted, DOCUMENTS_TABLE)
                .target(document_id)
                .changes(Changes::deleted(document))
                .ip(ip_address),
        )
    }

    pub fn log_ticket_assigned(
        &self,
        admin_id: UserId,
        ticket_id: &str,
        previous_assignee: Option<UserId>,
        assignee: UserId,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry, AuditError> {
        self.log_action(
            LogActionRequest::new(admin_id, ActionType::TicketAssigned, TICKETS_TABLE)
                .target(ticket_id)
                .changes(Changes::updated(
                    json!({ "assigned_to": previous_assignee }),
                    json!({ "assigned_to": assignee }),
                ))
                .ip(ip_address),
        )
    }

    pub fn log_tier_updated(
        &self,
        admin_id: UserId,
        client_id: ClientId,
        previous_tier: Option<&str>,
        new_tier: &str,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry, AuditError> {
        self.log_action(
            LogActionRequest::new(admin_id, ActionType::TierUpdated, CLIENTS_TABLE)
                .target(client_id.to_string())
                .changes(Changes::updated(
                    json!({ "tier": previous_tier }),
                    json!({ "tier": new_tier }),
                ))
                .ip(ip_address),
        )
    }

    fn scan(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, AuditError> {
        self.store.scan(filter).map_err(|e| {
            error!(error = %e, "audit log query failed");
            AuditError::from(e)
        })
    }
}

/// Timestamp descending; entries sharing a timestamp go latest-appended first.
fn sort_most_recent_first(entries: &mut [AuditLogEntry]) {
    entries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.sequence.cmp(&a.sequence))
    });
}
