use crate::{Gatekeeper, IamError};
use topo_domain::permissions::ActionSet;
use topo_kernel::context::RequestContext;
use tracing::warn;

/// Entry point the business facade consults before every operation.
#[derive(Debug, Clone)]
pub struct AuthManager {
    gatekeeper: Gatekeeper,
}

impl AuthManager {
    #[must_use]
    pub const fn new(gatekeeper: Gatekeeper) -> Self {
        Self { gatekeeper }
    }

    /// # Errors
    /// [`IamError::Forbidden`] when the caller lacks `action`.
    pub async fn authorize(&self, ctx: &RequestContext, action: ActionSet) -> Result<(), IamError> {
        let result = self.gatekeeper.authorizer().authorize(&ctx.operator, action).await;
        if let Err(err) = &result {
            warn!(request_id = %ctx.request_id, operator = %ctx.operator, ?action, %err, "Authorization denied");
        }
        result
    }

    #[must_use]
    pub const fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Authorizer;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct ReadOnly;

    #[async_trait]
    impl Authorizer for ReadOnly {
        async fn authorize(&self, operator: &str, action: ActionSet) -> Result<(), IamError> {
            if action == ActionSet::FIND {
                Ok(())
            } else {
                Err(IamError::Forbidden { message: operator.to_owned().into(), context: None })
            }
        }
    }

    #[tokio::test]
    async fn manager_delegates_to_the_selected_authorizer() {
        let manager = AuthManager::new(Gatekeeper::with(Arc::new(ReadOnly)));
        let ctx = RequestContext::new("carol", "req-1");

        assert!(manager.authorize(&ctx, ActionSet::FIND).await.is_ok());
        assert!(matches!(
            manager.authorize(&ctx, ActionSet::UPDATE).await,
            Err(IamError::Forbidden { .. })
        ));
        assert!(manager.gatekeeper().is_enabled());
    }
}
