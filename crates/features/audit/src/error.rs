use std::borrow::Cow;

/// Audit slice error type.
#[topo_derive::topo_error]
pub enum AuditError {
    /// The pre-mutation snapshot could not be taken; nothing was mutated.
    #[error("Audit capture failed{}: {message}", format_context(.context))]
    Capture { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The audited resource does not exist (or is not visible); nothing was mutated.
    #[error("Audited resource not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The mutation succeeded but its audit record could not be completed or stored.
    #[error("Audit persistence failed{}: {message}", format_context(.context))]
    Persistence {
        resource_id: i64,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Audit error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[cfg(feature = "server")]
impl topo_kernel::server::IntoApiError for AuditError {
    fn kind(&self) -> topo_kernel::server::ErrorKind {
        use topo_kernel::server::ErrorKind;

        match self {
            Self::Capture { .. } => ErrorKind::AuditCapture,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Persistence { .. } => ErrorKind::AuditPersistence,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    fn data(&self) -> Option<serde_json::Value> {
        match self {
            Self::Persistence { resource_id, .. } => Some(serde_json::json!({ "id": resource_id })),
            _ => None,
        }
    }
}
