use crate::safe_nanoid;
use topo_domain::constants::ANONYMOUS_OPERATOR;
use topo_domain::models::ScopeTag;

/// Who is calling, under which correlation id and tenant scope.
///
/// The operator and request id come from the `x-topo-user` / `x-request-id` headers;
/// the scope is taken from the request body's `metadata` once it is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub operator: String,
    pub request_id: String,
    pub scope: Option<ScopeTag>,
}

impl RequestContext {
    pub fn new(operator: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self { operator: operator.into(), request_id: request_id.into(), scope: None }
    }

    /// Anonymous caller with a fresh request id.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_OPERATOR, safe_nanoid!())
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Option<ScopeTag>) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn scope(&self) -> Option<&ScopeTag> {
        self.scope.as_ref()
    }
}

#[cfg(feature = "server")]
mod extract {
    use super::RequestContext;
    use crate::safe_nanoid;
    use axum::extract::FromRequestParts;
    use axum::http::HeaderMap;
    use axum::http::request::Parts;
    use std::convert::Infallible;
    use topo_domain::constants::{ANONYMOUS_OPERATOR, OPERATOR_HEADER, REQUEST_ID_HEADER};

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    impl<S> FromRequestParts<S> for RequestContext
    where
        S: Send + Sync,
    {
        type Rejection = Infallible;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
            let operator = header(&parts.headers, OPERATOR_HEADER).unwrap_or(ANONYMOUS_OPERATOR);
            let request_id = header(&parts.headers, REQUEST_ID_HEADER)
                .map_or_else(|| safe_nanoid!(), ToOwned::to_owned);

            Ok(Self::new(operator, request_id))
        }
    }
}
