use serde_json::json;
use std::time::Duration;
use topo_database::{Database, DatabaseError};
use topo_domain::config::DatabaseConfig;
use topo_domain::models::{
    Classification, ClassificationAttrs, Condition, FieldConstraint, Operator, Page, ScopeTag,
    SortKey,
};

async fn memory_db() -> Database {
    Database::builder().url("mem://").session("test_ns", "test_db").init().await.expect("mem://")
}

fn classification(key: &str, order: i64, scope: Option<&str>) -> Classification {
    Classification::from_attrs(
        0,
        ClassificationAttrs {
            classification_id: key.to_owned(),
            name: key.to_uppercase(),
            order,
            ..ClassificationAttrs::default()
        },
        scope.and_then(ScopeTag::new),
    )
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::connect(&DatabaseConfig::default()).await.expect("connect to mem://");
    db.health().expect("health check");
    assert_eq!(db.namespace(), "topo");
}

#[tokio::test]
async fn init_retries_until_the_engine_warmed_up() {
    let db = Database::builder()
        .url("mem://")
        .session("topo", "warm")
        .warm_up(Duration::from_millis(50))
        .backoff(Duration::from_millis(20))
        .health_check_attempts(6)
        .init()
        .await
        .expect("healthy after warm-up");
    db.health().expect("health check");
}

#[tokio::test]
async fn engine_that_stays_unhealthy_fails_init() {
    let err = Database::builder()
        .url("mem://")
        .session("topo", "cold")
        .warm_up(Duration::from_secs(60))
        .backoff(Duration::from_millis(5))
        .health_check_attempts(2)
        .init()
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Connection { .. }));
    assert!(err.to_string().contains("engine is starting"), "{err}");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));

    let err = Database::builder().url("mem://").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn unsupported_engine_is_a_connection_error() {
    let err = Database::builder()
        .url("mongodb://127.0.0.1:27017")
        .session("topo", "cmdb")
        .init()
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Connection { .. }));
}

#[tokio::test]
async fn inserts_assign_increasing_ids() {
    let db = memory_db().await;
    let first = db.classifications.write(|rows| Ok(rows.insert(classification("a", 0, None))));
    let second = db.classifications.write(|rows| Ok(rows.insert(classification("b", 0, None))));

    assert_eq!(first.expect("insert").id, 1);
    assert_eq!(second.expect("insert").id, 2);
}

#[tokio::test]
async fn select_filters_sorts_and_pages() {
    let db = memory_db().await;
    db.classifications
        .write(|rows| {
            for (key, order) in [("a", 3), ("b", 1), ("c", 2), ("d", 1)] {
                rows.insert(classification(key, order, None));
            }
            Ok(())
        })
        .expect("seed");

    let condition = Condition::default()
        .and(FieldConstraint {
            field: "order".to_owned(),
            operators: vec![Operator::Lte(json!(2))],
        })
        .with_page(Page { start: 1, limit: Some(2), sort: vec![SortKey::desc("order")] });

    let page = db.classifications.read(|rows| rows.select(&condition, None)).expect("select");
    let keys: Vec<_> = page.iter().map(|c| c.classification_id.as_str()).collect();
    // order desc: c(2), then b(1) and d(1) tied and broken by id
    assert_eq!(keys, ["b", "d"]);
}

#[tokio::test]
async fn select_respects_scope_visibility() {
    let db = memory_db().await;
    db.classifications
        .write(|rows| {
            rows.insert(classification("shared", 0, None));
            rows.insert(classification("mine", 0, Some("tenant-a")));
            rows.insert(classification("theirs", 0, Some("tenant-b")));
            Ok(())
        })
        .expect("seed");

    let scope = ScopeTag::new("tenant-a");
    let visible = db
        .classifications
        .read(|rows| rows.select(&Condition::default(), scope.as_ref()))
        .expect("select");
    let keys: Vec<_> = visible.iter().map(|c| c.classification_id.as_str()).collect();
    assert_eq!(keys, ["shared", "mine"]);

    let unscoped =
        db.classifications.read(|rows| rows.select(&Condition::default(), None)).expect("select");
    assert_eq!(unscoped.len(), 1);
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let db = memory_db().await;
    let condition = Condition::default().and(FieldConstraint::equals("color", "red"));
    let err = db.classifications.read(|rows| rows.select(&condition, None)).unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidInput { .. }));

    let condition = Condition::default().with_page(Page {
        sort: vec![SortKey::asc("color")],
        ..Page::default()
    });
    let err = db.classifications.read(|rows| rows.select(&condition, None)).unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidInput { .. }));
}

#[tokio::test]
async fn shutdown_makes_every_table_unavailable() {
    let db = memory_db().await;
    db.shutdown();

    assert!(matches!(db.health(), Err(DatabaseError::Connection { .. })));
    let err = db.objects.read(|rows| Ok(rows.len())).unwrap_err();
    assert!(matches!(err, DatabaseError::Connection { .. }));
}
