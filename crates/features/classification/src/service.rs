use crate::{ClassificationError, ClassificationRepository};
use topo_audit::AuditRecorder;
use topo_domain::models::{
    AuditAction, Classification, ClassificationAttrs, ClassificationPatch, ClassificationWithObjects,
    Condition,
};
use topo_domain::permissions::ActionSet;
use topo_iam::AuthManager;
use topo_kernel::context::RequestContext;
use tracing::info;

/// Business facade: authorization, then the repository call wrapped by the audit pipeline.
#[derive(Debug, Clone)]
pub struct ClassificationService {
    repository: ClassificationRepository,
    auth: AuthManager,
    audit: AuditRecorder,
}

impl ClassificationService {
    pub fn new(repository: ClassificationRepository, auth: AuthManager, audit: AuditRecorder) -> Self {
        Self { repository, auth, audit }
    }

    /// Creates under the caller's scope and records a `create` entry.
    ///
    /// # Errors
    /// An `Audit(Persistence)` error means the classification exists but its audit
    /// record does not.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        attrs: ClassificationAttrs,
    ) -> Result<Classification, ClassificationError> {
        self.auth.authorize(ctx, ActionSet::CREATE).await?;

        let mut pending = self.audit.begin(AuditAction::Create, 0, ctx);
        let created = self.repository.create(attrs, ctx.scope.clone()).await?;
        pending.set_resource_id(created.id);
        pending.finish(&self.repository).await?;

        info!(request_id = %ctx.request_id, operator = %ctx.operator, id = created.id, "Classification created");
        Ok(created)
    }

    pub async fn find(
        &self,
        ctx: &RequestContext,
        condition: &Condition,
    ) -> Result<Vec<Classification>, ClassificationError> {
        self.auth.authorize(ctx, ActionSet::FIND).await?;
        self.repository.find(condition, ctx.scope()).await
    }

    pub async fn find_with_related(
        &self,
        ctx: &RequestContext,
        condition: &Condition,
    ) -> Result<Vec<ClassificationWithObjects>, ClassificationError> {
        self.auth.authorize(ctx, ActionSet::FIND).await?;
        self.repository.find_with_related(condition, ctx.scope()).await
    }

    /// Updates `id` and records the before/after pair.
    ///
    /// # Errors
    /// `Audit(Capture)` aborts before anything changed; `Audit(Persistence)` reports a
    /// committed update without a complete audit record.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: &ClassificationPatch,
    ) -> Result<Classification, ClassificationError> {
        self.auth.authorize(ctx, ActionSet::UPDATE).await?;

        let mut pending = self.audit.begin(AuditAction::Update, id, ctx);
        pending.capture_before(&self.repository).await?;
        let updated = self.repository.update(id, patch, &Condition::default(), ctx.scope()).await?;
        pending.finish(&self.repository).await?;

        info!(request_id = %ctx.request_id, operator = %ctx.operator, id, "Classification updated");
        Ok(updated)
    }

    /// Deletes `id` and records its last state.
    ///
    /// # Errors
    /// As for [`Self::update`]; built-in classifications and those still owning objects
    /// are rejected with `InvalidInput`.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<Classification, ClassificationError> {
        self.auth.authorize(ctx, ActionSet::DELETE).await?;

        let mut pending = self.audit.begin(AuditAction::Delete, id, ctx);
        pending.capture_before(&self.repository).await?;
        let deleted = self.repository.delete(id, &Condition::default(), ctx.scope()).await?;
        pending.finish(&self.repository).await?;

        info!(request_id = %ctx.request_id, operator = %ctx.operator, id, "Classification deleted");
        Ok(deleted)
    }
}
