use std::borrow::Cow;
use topo_audit::AuditError;
use topo_database::DatabaseError;
use topo_iam::IamError;
use topo_kernel::condition::ConditionError;

#[topo_derive::topo_error]
pub enum ClassificationError {
    #[error("{source}")]
    Condition { source: ConditionError, context: Option<Cow<'static, str>> },

    /// Attribute validation, uniqueness or deletion guard.
    #[error("Invalid input{}: {message}", format_context(.context))]
    InvalidInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Absent, or not visible under the caller's scope.
    #[error("Classification not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{source}")]
    Iam { source: IamError, context: Option<Cow<'static, str>> },

    #[error("{source}")]
    Audit { source: AuditError, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Snapshot encoding failed{}: {source}", format_context(.context))]
    Encoding { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal classification error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ClassificationError {
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidInput { message: message.into(), context: None }
    }

    pub(crate) fn not_found(id: i64) -> Self {
        Self::NotFound { message: format!("id {id}").into(), context: None }
    }
}

#[cfg(feature = "server")]
mod api {
    use super::ClassificationError;
    use topo_database::DatabaseError;
    use topo_kernel::server::{ErrorKind, IntoApiError};

    impl IntoApiError for ClassificationError {
        fn kind(&self) -> ErrorKind {
            match self {
                Self::Condition { .. } => ErrorKind::MalformedFilter,
                Self::InvalidInput { .. } => ErrorKind::InvalidInput,
                Self::NotFound { .. } => ErrorKind::NotFound,
                Self::Iam { source, .. } => source.kind(),
                Self::Audit { source, .. } => source.kind(),
                Self::Storage { source, .. } => match source {
                    DatabaseError::Connection { .. } => ErrorKind::StorageUnavailable,
                    DatabaseError::InvalidInput { .. } | DatabaseError::Validation { .. } => {
                        ErrorKind::InvalidInput
                    }
                    DatabaseError::NotFound { .. } => ErrorKind::NotFound,
                    _ => ErrorKind::Internal,
                },
                Self::Encoding { .. } | Self::Internal { .. } => ErrorKind::Internal,
            }
        }

        fn data(&self) -> Option<serde_json::Value> {
            match self {
                Self::Audit { source, .. } => source.data(),
                _ => None,
            }
        }
    }
}
