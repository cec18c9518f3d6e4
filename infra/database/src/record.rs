use serde::Serialize;
use topo_domain::models::{AuditRecord, Classification, ObjectSummary, ScopeTag};

/// A row type stored in a [`Table`](crate::Table).
///
/// `FIELDS` lists the wire names that filters and sort keys may reference.
pub trait Record: Serialize + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const FIELDS: &'static [&'static str];

    fn id(&self) -> i64;

    /// Called once on insert with the next sequence value.
    fn assign_id(&mut self, id: i64);

    fn scope(&self) -> Option<&ScopeTag> {
        None
    }
}

impl Record for Classification {
    const TABLE: &'static str = "cc_ObjClassification";
    const FIELDS: &'static [&'static str] =
        &["id", "classificationId", "name", "icon", "kind", "order", "metadata"];

    fn id(&self) -> i64 {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = id;
    }

    fn scope(&self) -> Option<&ScopeTag> {
        self.metadata.as_ref()
    }
}

impl Record for ObjectSummary {
    const TABLE: &'static str = "cc_ObjDes";
    const FIELDS: &'static [&'static str] =
        &["id", "objectId", "name", "icon", "classificationId", "metadata"];

    fn id(&self) -> i64 {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = id;
    }

    fn scope(&self) -> Option<&ScopeTag> {
        self.metadata.as_ref()
    }
}

impl Record for AuditRecord {
    const TABLE: &'static str = "cc_AuditLog";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "action",
        "resourceType",
        "resourceId",
        "operator",
        "requestId",
        "scope",
        "timestamp",
        "complete",
    ];

    fn id(&self) -> i64 {
        self.id.unwrap_or_default()
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn scope(&self) -> Option<&ScopeTag> {
        self.scope.as_ref()
    }
}
