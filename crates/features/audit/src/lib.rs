//! Audit feature slice.
//!
//! Every mutation of an audited resource runs through a [`PendingAudit`]:
//! `begin` → `capture_before` → *mutation* → `capture_after` → `commit`.
//! How a failed pre-mutation snapshot is treated is set by
//! [`CapturePolicy`](topo_domain::config::CapturePolicy).
mod error;
mod recorder;
mod store;

pub use crate::error::{AuditError, AuditErrorExt};
pub use crate::recorder::{AuditRecorder, PendingAudit, SnapshotSource};
pub use crate::store::AuditStore;

use std::sync::Arc;
use topo_database::Database;
use topo_domain::config::ApiConfig;
use topo_domain::constants::CLASSIFICATION;
use topo_domain::registry::InitializedSlice;

/// Audit feature inner state.
#[topo_derive::topo_slice]
pub struct Audit {
    pub recorder: AuditRecorder,
}

/// Builds the recorder over the database's audit table.
///
/// # Errors
/// Currently infallible; kept fallible like every slice initializer.
pub fn init(config: &ApiConfig, database: &Database) -> Result<InitializedSlice, AuditError> {
    let store: Arc<dyn AuditStore> = Arc::new(database.clone());
    let recorder = AuditRecorder::new(store, config.audit.capture_policy, CLASSIFICATION);
    tracing::info!(policy = ?config.audit.capture_policy, "Audit slice initialized");

    Ok(InitializedSlice::new(Audit::new(AuditInner { recorder })))
}
