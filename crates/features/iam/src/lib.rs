//! IAM feature slice.
//!
//! The [`Gatekeeper`] picks the [`Authorizer`] once at bootstrap: the [`IamClient`] when
//! the `auth.enabled` toggle is set, the [`NoopAuthorizer`] otherwise. The
//! [`AuthManager`] is what the rest of the service talks to.

mod error;
mod gatekeeper;
mod manager;

pub use crate::error::{IamError, IamErrorExt};
pub use crate::gatekeeper::{ANY_OPERATOR, Authorizer, Gatekeeper, IamClient, NoopAuthorizer};
pub use crate::manager::AuthManager;
use topo_domain::registry::InitializedSlice;

/// Feature inner state
#[topo_derive::topo_slice]
pub struct Iam {
    pub auth: AuthManager,
}

/// Wraps the bootstrap-selected gatekeeper into the IAM slice.
///
/// # Errors
/// Currently infallible; kept fallible like every slice initializer.
pub fn init(gatekeeper: Gatekeeper) -> Result<InitializedSlice, IamError> {
    tracing::info!(enabled = gatekeeper.is_enabled(), "IAM slice initialized");

    Ok(InitializedSlice::new(Iam::new(IamInner { auth: AuthManager::new(gatekeeper) })))
}
