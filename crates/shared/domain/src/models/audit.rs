use super::ScopeTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    /// Whether the pre-mutation snapshot is part of the record.
    #[must_use]
    pub const fn captures_before(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }

    /// Whether the post-mutation snapshot is part of the record.
    #[must_use]
    pub const fn captures_after(self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

/// One persisted mutation of a resource with its before/after snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Assigned by the audit store on append.
    pub id: Option<i64>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: i64,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub operator: String,
    pub request_id: String,
    pub scope: Option<ScopeTag>,
    pub timestamp: DateTime<Utc>,
    /// `false` when a snapshot was skipped under the best-effort policy.
    pub complete: bool,
}
