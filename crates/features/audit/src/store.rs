use async_trait::async_trait;
use std::fmt::Debug;
use topo_database::{Database, DatabaseError};
use topo_domain::models::AuditRecord;

/// Append-only audit trail.
#[async_trait]
pub trait AuditStore: Debug + Send + Sync {
    /// Persists `record` and returns it with its assigned id.
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, DatabaseError>;

    /// Records of one resource, oldest first.
    async fn history(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditRecord>, DatabaseError>;
}

#[async_trait]
impl AuditStore for Database {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, DatabaseError> {
        self.audit.write(|rows| Ok(rows.insert(record)))
    }

    async fn history(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditRecord>, DatabaseError> {
        self.audit.read(|rows| {
            Ok(rows
                .iter()
                .filter(|r| r.resource_type == resource_type && r.resource_id == resource_id)
                .cloned()
                .collect())
        })
    }
}
