use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use fleetdesk_core::{AuditLogId, UserId};

/// Whitelisted administrative action kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ClientCreated,
    ClientUpdated,
    ClientDeactivated,
    ClientReactivated,
    TierUpdated,
    DocumentUploaded,
    DocumentDeleted,
    TicketAssigned,
    TicketStatusUpdated,
    UserCreated,
    UserDeleted,
    SettingsUpdated,
}

impl ActionType {
    pub const ALL: [ActionType; 12] = [
        ActionType::ClientCreated,
        ActionType::ClientUpdated,
        ActionType::ClientDeactivated,
        ActionType::ClientReactivated,
        ActionType::TierUpdated,
        ActionType::DocumentUploaded,
        ActionType::DocumentDeleted,
        ActionType::TicketAssigned,
        ActionType::TicketStatusUpdated,
        ActionType::UserCreated,
        ActionType::UserDeleted,
        ActionType::SettingsUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ClientCreated => "client_created",
            ActionType::ClientUpdated => "client_updated",
            ActionType::ClientDeactivated => "client_deactivated",
            ActionType::ClientReactivated => "client_reactivated",
            ActionType::TierUpdated => "tier_updated",
            ActionType::DocumentUploaded => "document_uploaded",
            ActionType::DocumentDeleted => "document_deleted",
            ActionType::TicketAssigned => "ticket_assigned",
            ActionType::TicketStatusUpdated => "ticket_status_updated",
            ActionType::UserCreated => "user_created",
            ActionType::UserDeleted => "user_deleted",
            ActionType::SettingsUpdated => "settings_updated",
        }
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("invalid action_type '{s}'"))
    }
}

/// Before/after snapshot of the mutated record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Changes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<JsonValue>,
}

impl Changes {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn created(after: JsonValue) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: JsonValue, after: JsonValue) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: JsonValue) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }
}

/// A validated entry ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub id: AuditLogId,
    pub admin_id: UserId,
    pub action_type: ActionType,
    pub target_table: String,
    pub target_id: Option<String>,
    pub changes: Changes,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A stored audit entry.
///
/// `sequence` is assigned by the log store on append, is strictly increasing,
/// and orders entries that share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub sequence: u64,
    pub admin_id: UserId,
    pub action_type: ActionType,
    pub target_table: String,
    pub target_id: Option<String>,
    pub changes: Changes,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn from_new(entry: NewAuditEntry, sequence: u64) -> Self {
        Self {
            id: entry.id,
            sequence,
            admin_id: entry.admin_id,
            action_type: entry.action_type,
            target_table: entry.target_table,
            target_id: entry.target_id,
            changes: entry.changes,
            ip_address: entry.ip_address,
            timestamp: entry.timestamp,
        }
    }
}
