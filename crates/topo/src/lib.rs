//! Facade crate for the topology classification service.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `topo` with the `server` feature for the REST surface.
//! - Call [`init`] once storage and the gatekeeper are known; the returned slices are
//!   registered into the API state in order.

use std::borrow::Cow;
use topo_database::Database;
pub use topo_domain as domain;
use topo_domain::config::ApiConfig;
use topo_domain::registry::InitializedSlice;
pub use topo_kernel as kernel;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use topo_classification::handlers::router as classification_router;
        pub use topo_kernel::server::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use topo_audit as audit;
    pub use topo_classification as classification;
    pub use topo_iam as iam;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        "iam",
        "audit",
        "classification",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[topo_derive::topo_error]
pub enum InitError {
    #[error("IAM slice failed{}: {source}", format_context(.context))]
    Iam { source: topo_iam::IamError, context: Option<Cow<'static, str>> },

    #[error("Audit slice failed{}: {source}", format_context(.context))]
    Audit { source: topo_audit::AuditError, context: Option<Cow<'static, str>> },

    #[error("Classification slice failed{}: {source}", format_context(.context))]
    Classification {
        source: topo_classification::ClassificationError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Slice wiring failed{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Initializes every feature slice; later slices borrow collaborators from earlier ones.
///
/// # Errors
/// Returns an error if any feature initialization fails.
pub fn init(
    config: &ApiConfig,
    database: &Database,
    gatekeeper: features::iam::Gatekeeper,
) -> Result<Vec<InitializedSlice>, InitError> {
    // Identity & Access Management (IAM)
    let iam = features::iam::init(gatekeeper)?;
    let auth = iam
        .downcast::<features::iam::Iam>()
        .map(|iam| iam.auth.clone())
        .ok_or("IAM slice has an unexpected type")?;

    // Audit
    let audit = features::audit::init(config, database)?;
    let recorder = audit
        .downcast::<features::audit::Audit>()
        .map(|audit| audit.recorder.clone())
        .ok_or("audit slice has an unexpected type")?;

    // Classification
    let classification = features::classification::init(database, auth, recorder)?;

    Ok(vec![iam, audit, classification])
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_domain::registry::FeatureSlice;

    #[tokio::test]
    async fn every_slice_is_initialized() {
        let db = Database::builder().url("mem://").session("topo", "facade").init().await.expect("db");
        let slices =
            init(&ApiConfig::default(), &db, features::iam::Gatekeeper::disabled()).expect("init");

        assert_eq!(slices.len(), 3);
        assert!(slices.iter().any(|s| s.downcast::<features::iam::Iam>().is_some()));
        assert!(slices.iter().any(|s| s.downcast::<features::audit::Audit>().is_some()));
        let classifications = slices
            .iter()
            .find_map(|s| s.downcast::<features::classification::Classifications>())
            .expect("classification slice");
        assert!(classifications.as_any().is::<features::classification::Classifications>());
        assert!(features::is_enabled("classification"));
    }
}
