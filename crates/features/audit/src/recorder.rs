use crate::{AuditError, AuditStore};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;
use topo_domain::config::CapturePolicy;
use topo_domain::models::{AuditAction, AuditRecord, ScopeTag};
use topo_kernel::context::RequestContext;
use tracing::{debug, warn};

/// Read access to the current state of an audited resource.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// `Ok(None)` when the resource does not exist or is not visible under `scope`.
    async fn snapshot(
        &self,
        resource_id: i64,
        scope: Option<&ScopeTag>,
    ) -> Result<Option<Value>, Self::Error>;
}

/// Opens one audit record per mutation.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    policy: CapturePolicy,
    resource_type: &'static str,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, policy: CapturePolicy, resource_type: &'static str) -> Self {
        Self { store, policy, resource_type }
    }

    #[must_use]
    pub const fn policy(&self) -> CapturePolicy {
        self.policy
    }

    /// Starts a record for `action` on `resource_id`, correlated with the caller.
    ///
    /// For creates the id is unknown up front; pass `0` and call
    /// [`PendingAudit::set_resource_id`] once storage assigned one.
    #[must_use]
    pub fn begin(&self, action: AuditAction, resource_id: i64, ctx: &RequestContext) -> PendingAudit {
        PendingAudit {
            store: Arc::clone(&self.store),
            policy: self.policy,
            record: AuditRecord {
                id: None,
                action,
                resource_type: self.resource_type.to_owned(),
                resource_id,
                before: None,
                after: None,
                operator: ctx.operator.clone(),
                request_id: ctx.request_id.clone(),
                scope: ctx.scope.clone(),
                timestamp: Utc::now(),
                complete: true,
            },
        }
    }
}

/// A record between [`AuditRecorder::begin`] and [`PendingAudit::commit`].
///
/// Steps that do not apply to the action (before-snapshot of a create, after-snapshot
/// of a delete) are no-ops.
#[derive(Debug)]
pub struct PendingAudit {
    store: Arc<dyn AuditStore>,
    policy: CapturePolicy,
    record: AuditRecord,
}

impl PendingAudit {
    /// Snapshots the resource before it is mutated.
    ///
    /// # Errors
    /// * [`AuditError::NotFound`] when there is nothing to mutate, under either policy.
    /// * [`AuditError::Capture`] under the strict policy; the caller must not mutate.
    ///   Under the best-effort policy the failure is logged and the record is marked
    ///   incomplete.
    pub async fn capture_before<S>(&mut self, source: &S) -> Result<(), AuditError>
    where
        S: SnapshotSource + ?Sized,
    {
        if !self.record.action.captures_before() {
            return Ok(());
        }

        match source.snapshot(self.record.resource_id, self.record.scope.as_ref()).await {
            Ok(Some(before)) => {
                self.record.before = Some(before);
                Ok(())
            }
            Ok(None) => Err(AuditError::NotFound {
                message: format!("{} {}", self.record.resource_type, self.record.resource_id).into(),
                context: None,
            }),
            Err(err) if self.policy == CapturePolicy::BestEffort => {
                warn!(
                    request_id = %self.record.request_id,
                    resource_id = self.record.resource_id,
                    %err,
                    "Pre-mutation snapshot skipped"
                );
                self.record.complete = false;
                Ok(())
            }
            Err(err) => Err(AuditError::Capture {
                message: err.to_string().into(),
                context: Some(format!("{} {}", self.record.action, self.record.resource_id).into()),
            }),
        }
    }

    /// Snapshots the resource after a successful mutation.
    ///
    /// # Errors
    /// [`AuditError::Persistence`]; the record is marked incomplete but can still be
    /// committed.
    pub async fn capture_after<S>(&mut self, source: &S) -> Result<(), AuditError>
    where
        S: SnapshotSource + ?Sized,
    {
        if !self.record.action.captures_after() {
            return Ok(());
        }

        match source.snapshot(self.record.resource_id, self.record.scope.as_ref()).await {
            Ok(Some(after)) => {
                self.record.after = Some(after);
                Ok(())
            }
            Ok(None) => {
                self.record.complete = false;
                Err(self.persistence("resource vanished after mutation".to_owned(), "after snapshot"))
            }
            Err(err) => {
                self.record.complete = false;
                Err(self.persistence(err.to_string(), "after snapshot"))
            }
        }
    }

    pub fn set_resource_id(&mut self, resource_id: i64) {
        self.record.resource_id = resource_id;
    }

    #[must_use]
    pub const fn record(&self) -> &AuditRecord {
        &self.record
    }

    /// Whether every applicable snapshot was taken so far.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.record.complete
    }

    /// Persists the record. A failure never undoes the mutation it describes.
    ///
    /// # Errors
    /// [`AuditError::Persistence`] when the audit store rejects the record.
    pub async fn commit(self) -> Result<AuditRecord, AuditError> {
        let request_id = self.record.request_id.clone();
        let resource_id = self.record.resource_id;
        match self.store.append(self.record).await {
            Ok(record) => {
                debug!(%request_id, resource_id, audit_id = ?record.id, action = %record.action, "Audit record stored");
                Ok(record)
            }
            Err(err) => Err(AuditError::Persistence {
                resource_id,
                message: err.to_string().into(),
                context: Some("commit".into()),
            }),
        }
    }

    /// Post-mutation half of the pipeline: after-snapshot, then commit.
    ///
    /// The record is committed even when the after-snapshot failed, so the trail keeps
    /// what is known.
    ///
    /// # Errors
    /// [`AuditError::Persistence`] when the after-snapshot or the commit failed, or when
    /// the stored record is incomplete. The mutation stands in every case.
    pub async fn finish<S>(mut self, source: &S) -> Result<AuditRecord, AuditError>
    where
        S: SnapshotSource + ?Sized,
    {
        let after = self.capture_after(source).await;
        let record = self.commit().await?;
        after?;

        if record.complete {
            Ok(record)
        } else {
            Err(AuditError::Persistence {
                resource_id: record.resource_id,
                message: "audit record is incomplete".into(),
                context: record.id.map(|id| format!("audit {id}").into()),
            })
        }
    }

    fn persistence(&self, message: String, step: &'static str) -> AuditError {
        AuditError::Persistence {
            resource_id: self.record.resource_id,
            message: message.into(),
            context: Some(step.into()),
        }
    }
}
