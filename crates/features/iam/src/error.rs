use std::borrow::Cow;

/// A specialized [`IamError`] enum of this crate.
#[topo_derive::topo_error]
pub enum IamError {
    /// The `authServer` block is missing or unusable.
    #[error("Invalid security configuration{}: {message}", format_context(.context))]
    InvalidConfig { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Operation not permitted{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal feature error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[cfg(feature = "server")]
impl topo_kernel::server::IntoApiError for IamError {
    fn kind(&self) -> topo_kernel::server::ErrorKind {
        use topo_kernel::server::ErrorKind;

        match self {
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidConfig { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}
