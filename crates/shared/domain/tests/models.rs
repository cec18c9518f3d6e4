use serde_json::json;
use topo_domain::models::{
    AuditAction, Classification, ClassificationAttrs, ClassificationPatch,
    ClassificationWithObjects, ScopeTag,
};

fn sample() -> Classification {
    Classification::from_attrs(
        7,
        ClassificationAttrs {
            classification_id: "bk_network".to_owned(),
            name: "Network".to_owned(),
            icon: "icon-net".to_owned(),
            kind: String::new(),
            order: 3,
        },
        ScopeTag::new("tenant-a"),
    )
}

#[test]
fn classification_uses_camel_case_on_the_wire() {
    let value = serde_json::to_value(sample()).expect("serialize");
    assert_eq!(value["classificationId"], "bk_network");
    assert_eq!(value["metadata"], "tenant-a");
    assert_eq!(value["order"], 3);
}

#[test]
fn patch_leaves_identity_and_scope_alone() {
    let mut entity = sample();
    entity.apply(&ClassificationPatch {
        name: Some("Networking".to_owned()),
        icon: None,
        order: Some(9),
    });

    assert_eq!(entity.id, 7);
    assert_eq!(entity.classification_id, "bk_network");
    assert_eq!(entity.name, "Networking");
    assert_eq!(entity.icon, "icon-net");
    assert_eq!(entity.order, 9);
    assert_eq!(entity.metadata, ScopeTag::new("tenant-a"));
}

#[test]
fn with_objects_flattens_the_classification() {
    let nested = ClassificationWithObjects { classification: sample(), objects: Vec::new() };
    let value = serde_json::to_value(nested).expect("serialize");
    assert_eq!(value["id"], 7);
    assert_eq!(value["objects"], json!([]));
}

#[test]
fn audit_action_names() {
    assert_eq!(AuditAction::Update.to_string(), "update");
    assert_eq!("delete".parse::<AuditAction>().ok(), Some(AuditAction::Delete));
    assert!(!AuditAction::Create.captures_before());
    assert!(!AuditAction::Delete.captures_after());
}
