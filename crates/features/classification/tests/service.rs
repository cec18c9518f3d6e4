use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use topo_audit::{AuditError, AuditRecorder, AuditStore};
use topo_classification::{ClassificationError, ClassificationRepository, ClassificationService};
use topo_database::{Database, DatabaseError};
use topo_domain::config::CapturePolicy;
use topo_domain::constants::{CLASSIFICATION, INNER_KIND};
use topo_domain::models::{
    AuditAction, AuditRecord, ClassificationAttrs, ClassificationPatch, Condition, ObjectSummary,
    ScopeTag,
};
use topo_iam::{AuthManager, Gatekeeper};
use topo_kernel::condition::ConditionBuilder;
use topo_kernel::context::RequestContext;

/// An audit store whose every append fails.
#[derive(Debug)]
struct BrokenTrail;

#[async_trait]
impl AuditStore for BrokenTrail {
    async fn append(&self, _record: AuditRecord) -> Result<AuditRecord, DatabaseError> {
        Err(DatabaseError::Connection { message: "trail offline".into(), context: None })
    }

    async fn history(&self, _resource_type: &str, _resource_id: i64) -> Result<Vec<AuditRecord>, DatabaseError> {
        Ok(Vec::new())
    }
}

async fn database() -> Database {
    Database::builder().url("mem://").session("it", "classification").init().await.expect("db")
}

fn service_with(db: &Database, trail: Arc<dyn AuditStore>) -> ClassificationService {
    let repository = ClassificationRepository::new(Arc::new(db.clone()));
    let recorder = AuditRecorder::new(trail, CapturePolicy::Strict, CLASSIFICATION);
    ClassificationService::new(repository, AuthManager::new(Gatekeeper::disabled()), recorder)
}

fn service(db: &Database) -> ClassificationService {
    service_with(db, Arc::new(db.clone()))
}

fn attrs(key: &str, name: &str) -> ClassificationAttrs {
    ClassificationAttrs { classification_id: key.to_owned(), name: name.to_owned(), ..Default::default() }
}

fn scoped(tag: &str) -> RequestContext {
    RequestContext::new("ops", "req-scoped").with_scope(ScopeTag::new(tag))
}

fn filter(value: Value) -> Condition {
    let Value::Object(map) = value else { panic!("filter must be an object") };
    ConditionBuilder::parse(map).expect("valid filter")
}

fn attach_object(db: &Database, key: &str) {
    db.objects
        .write(|rows| {
            Ok(rows.insert(ObjectSummary {
                id: 0,
                object_id: format!("{key}_obj"),
                name: "Object".to_owned(),
                icon: String::new(),
                classification_id: key.to_owned(),
                metadata: None,
            }))
        })
        .expect("seed object");
}

#[tokio::test]
async fn created_classification_is_found_and_audited() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::new("admin", "req-1");

    let created = svc.create(&ctx, attrs("bk_host_manage", "Host")).await.expect("create");
    assert!(created.id > 0);

    let found = svc.find(&ctx, &filter(json!({"classificationId": "bk_host_manage"}))).await.expect("find");
    assert_eq!(found, vec![created.clone()]);

    let history = db.history(CLASSIFICATION, created.id).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, AuditAction::Create);
    assert!(history[0].before.is_none());
    assert_eq!(history[0].after.as_ref().and_then(|a| a.get("name")), Some(&json!("Host")));
    assert_eq!(history[0].operator, "admin");
    assert_eq!(history[0].request_id, "req-1");
    assert!(history[0].complete);
}

#[tokio::test]
async fn update_records_before_and_after() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::new("admin", "req-2");
    let created = svc.create(&ctx, attrs("bk_network", "Network")).await.expect("create");

    let patch = ClassificationPatch { name: Some("Networking".to_owned()), order: Some(7), ..Default::default() };
    let updated = svc.update(&ctx, created.id, &patch).await.expect("update");
    assert_eq!(updated.name, "Networking");
    assert_eq!(updated.classification_id, "bk_network");
    assert_eq!(updated.order, 7);

    let history = db.history(CLASSIFICATION, created.id).await.expect("history");
    let update = history.iter().find(|r| r.action == AuditAction::Update).expect("update record");
    assert_eq!(update.before, Some(serde_json::to_value(&created).expect("before")));
    assert_eq!(update.after, Some(serde_json::to_value(&updated).expect("after")));
    assert!(update.complete);
}

#[tokio::test]
async fn delete_records_the_last_state_only() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::new("admin", "req-3");
    let created = svc.create(&ctx, attrs("bk_middleware", "Middleware")).await.expect("create");

    svc.delete(&ctx, created.id).await.expect("delete");
    assert!(svc.find(&ctx, &Condition::by_id(created.id)).await.expect("find").is_empty());

    let history = db.history(CLASSIFICATION, created.id).await.expect("history");
    let delete = history.iter().find(|r| r.action == AuditAction::Delete).expect("delete record");
    assert_eq!(delete.before.as_ref().and_then(|b| b.get("classificationId")), Some(&json!("bk_middleware")));
    assert!(delete.after.is_none());
}

#[tokio::test]
async fn missing_targets_are_not_found_without_a_record() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::anonymous();

    let err = svc.update(&ctx, 404, &ClassificationPatch::default()).await.unwrap_err();
    assert!(matches!(err, ClassificationError::Audit { source: AuditError::NotFound { .. }, .. }));
    let err = svc.delete(&ctx, 404).await.unwrap_err();
    assert!(matches!(err, ClassificationError::Audit { source: AuditError::NotFound { .. }, .. }));
    assert!(db.history(CLASSIFICATION, 404).await.expect("history").is_empty());
}

#[tokio::test]
async fn failed_audit_reports_partial_success_after_the_mutation() {
    let db = database().await;
    let svc = service_with(&db, Arc::new(BrokenTrail));
    let ctx = RequestContext::new("admin", "req-4");

    let err = svc.create(&ctx, attrs("bk_storage", "Storage")).await.unwrap_err();
    let ClassificationError::Audit { source: AuditError::Persistence { resource_id, .. }, .. } = err else {
        panic!("expected an audit persistence error, got {err}");
    };
    assert!(resource_id > 0);

    let found = svc.find(&ctx, &Condition::by_id(resource_id)).await.expect("find");
    assert_eq!(found.len(), 1, "the mutation must stand");
}

#[tokio::test]
async fn failed_audit_after_update_keeps_the_patch() {
    let db = database().await;
    let ctx = RequestContext::new("admin", "req-5");
    let created = service(&db).create(&ctx, attrs("bk_database", "Database")).await.expect("create");

    let svc = service_with(&db, Arc::new(BrokenTrail));
    let patch = ClassificationPatch { name: Some("Databases".to_owned()), ..Default::default() };
    let err = svc.update(&ctx, created.id, &patch).await.unwrap_err();
    let ClassificationError::Audit { source: AuditError::Persistence { resource_id, .. }, .. } = err else {
        panic!("expected an audit persistence error, got {err}");
    };
    assert_eq!(resource_id, created.id);

    let found = svc.find(&ctx, &Condition::by_id(created.id)).await.expect("find");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Databases");
    assert_eq!(found[0].classification_id, "bk_database");

    let history = db.history(CLASSIFICATION, created.id).await.expect("history");
    assert!(history.iter().all(|r| r.action == AuditAction::Create), "no update record was stored");
}

#[tokio::test]
async fn scopes_never_see_each_other() {
    let db = database().await;
    let svc = service(&db);
    let shared = svc.create(&RequestContext::anonymous(), attrs("bk_shared", "Shared")).await.expect("shared");
    let a = svc.create(&scoped("tenant-a"), attrs("bk_a", "Only A")).await.expect("a");
    svc.create(&scoped("tenant-b"), attrs("bk_b", "Only B")).await.expect("b");

    let seen_by_a = svc.find(&scoped("tenant-a"), &Condition::default()).await.expect("find a");
    let ids: Vec<i64> = seen_by_a.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![shared.id, a.id]);

    let unscoped = svc.find(&RequestContext::anonymous(), &Condition::default()).await.expect("find");
    assert_eq!(unscoped.len(), 1);
    assert_eq!(unscoped[0].id, shared.id);

    let err = svc.update(&scoped("tenant-b"), a.id, &ClassificationPatch::default()).await.unwrap_err();
    assert!(matches!(err, ClassificationError::Audit { source: AuditError::NotFound { .. }, .. }));
}

#[tokio::test]
async fn duplicates_are_rejected() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::anonymous();
    let first = svc.create(&ctx, attrs("bk_host", "Host")).await.expect("create");
    let second = svc.create(&ctx, attrs("bk_other", "Other")).await.expect("create");

    let err = svc.create(&ctx, attrs("bk_host", "Another")).await.unwrap_err();
    assert!(matches!(err, ClassificationError::InvalidInput { .. }));
    let err = svc.create(&ctx, attrs("bk_host2", "Host")).await.unwrap_err();
    assert!(matches!(err, ClassificationError::InvalidInput { .. }));

    let rename = ClassificationPatch { name: Some("Host".to_owned()), ..Default::default() };
    let err = svc.update(&ctx, second.id, &rename).await.unwrap_err();
    assert!(matches!(err, ClassificationError::InvalidInput { .. }));
    // Renaming to its own name is not a conflict.
    svc.update(&ctx, first.id, &rename).await.expect("self rename");
}

#[tokio::test]
async fn built_in_and_owning_classifications_cannot_be_deleted() {
    let db = database().await;
    let svc = service(&db);
    let ctx = RequestContext::anonymous();

    let mut inner = attrs("bk_biz_topo", "Business topology");
    inner.kind = INNER_KIND.to_owned();
    let inner = svc.create(&ctx, inner).await.expect("inner");
    let err = svc.delete(&ctx, inner.id).await.unwrap_err();
    assert!(matches!(err, ClassificationError::InvalidInput { .. }));

    let owning = svc.create(&ctx, attrs("bk_database", "Database")).await.expect("owning");
    attach_object(&db, "bk_database");
    let err = svc.delete(&ctx, owning.id).await.unwrap_err();
    assert!(matches!(err, ClassificationError::InvalidInput { .. }));

    let with_objects = svc
        .find_with_related(&ctx, &filter(json!({"classificationId": "bk_database"})))
        .await
        .expect("with objects");
    assert_eq!(with_objects.len(), 1);
    assert_eq!(with_objects[0].objects.len(), 1);
    assert_eq!(with_objects[0].objects[0].object_id, "bk_database_obj");
}

#[tokio::test]
async fn unknown_filter_fields_are_storage_input_errors() {
    let db = database().await;
    let svc = service(&db);

    let err = svc
        .find(&RequestContext::anonymous(), &filter(json!({"bk_unknown": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, ClassificationError::Storage { source: DatabaseError::InvalidInput { .. }, .. }));
}

#[tokio::test]
async fn offline_storage_surfaces_as_storage_error() {
    let db = database().await;
    let svc = service(&db);
    db.shutdown();

    let err = svc.find(&RequestContext::anonymous(), &Condition::default()).await.unwrap_err();
    assert!(matches!(err, ClassificationError::Storage { source: DatabaseError::Connection { .. }, .. }));
}

mod pagination {
    use super::*;
    use proptest::prelude::*;

    fn page(start: u64, limit: u32) -> Condition {
        let mut page = Map::new();
        page.insert("start".to_owned(), json!(start));
        page.insert("limit".to_owned(), json!(limit));
        page.insert("sort".to_owned(), json!("-order"));
        let mut body = Map::new();
        body.insert("page".to_owned(), Value::Object(page));
        ConditionBuilder::parse(body).expect("page")
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn windows_are_bounded_and_disjoint(total in 0usize..20, start in 0u64..25, limit in 1u32..10) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime");
            runtime.block_on(async {
                let db = database().await;
                let svc = service(&db);
                let ctx = RequestContext::anonymous();
                for i in 0..total {
                    let mut attrs = attrs(&format!("bk_{i}"), &format!("Group {i}"));
                    attrs.order = i64::try_from(i % 4).expect("small");
                    svc.create(&ctx, attrs).await.expect("create");
                }

                let first = svc.find(&ctx, &page(start, limit)).await.expect("first window");
                let next = svc.find(&ctx, &page(start + u64::from(limit), limit)).await.expect("next window");

                let remaining = total.saturating_sub(usize::try_from(start).expect("small"));
                prop_assert_eq!(first.len(), remaining.min(limit as usize));
                prop_assert!(first.windows(2).all(|w| w[0].order >= w[1].order));
                prop_assert!(first.iter().all(|a| next.iter().all(|b| a.id != b.id)));
                Ok(())
            })?;
        }
    }
}
