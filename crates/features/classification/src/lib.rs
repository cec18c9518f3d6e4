//! Classification feature slice.
//!
//! * [`ClassificationRepository`] owns storage access, attribute validation and the
//!   deletion guards.
//! * [`ClassificationService`] authorizes every call and runs mutations through the
//!   audit pipeline of `topo-audit`.
//! * `handlers` (feature `server`) exposes the REST surface under `/classification`.

mod error;
#[cfg(feature = "server")]
pub mod handlers;
mod repository;
mod service;
mod store;

pub use crate::error::{ClassificationError, ClassificationErrorExt};
pub use crate::repository::ClassificationRepository;
pub use crate::service::ClassificationService;
pub use crate::store::ClassificationStore;

use std::sync::Arc;
use topo_audit::AuditRecorder;
use topo_database::Database;
use topo_domain::registry::InitializedSlice;
use topo_iam::AuthManager;

#[topo_derive::topo_slice]
pub struct Classifications {
    pub service: ClassificationService,
}

/// Wires the repository over `database` with the IAM and audit collaborators.
///
/// # Errors
/// Currently infallible; kept fallible like every slice initializer.
pub fn init(
    database: &Database,
    auth: AuthManager,
    recorder: AuditRecorder,
) -> Result<InitializedSlice, ClassificationError> {
    let store: Arc<dyn ClassificationStore> = Arc::new(database.clone());
    let repository = ClassificationRepository::new(store);
    tracing::info!("Classification slice initialized");

    Ok(InitializedSlice::new(Classifications::new(ClassificationsInner {
        service: ClassificationService::new(repository, auth, recorder),
    })))
}
