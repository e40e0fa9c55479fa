use formwork_types::{Operation, Record, Summary};
use serde_json::json;
use std::sync::Arc;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn creation_summary_has_no_previous_values_or_changes() {
    let s = Summary::creation(record(json!({"a": 1, "v": true})), record(json!({"a": 1})));
    assert_eq!(s.operation(), Operation::Creation);
    assert!(!s.is_update());
    assert!(s.previous_values().is_none());
    assert!(s.changes().is_none());
    assert_eq!(s.values().len(), 1);
    assert_eq!(s.get_bool("v"), Some(true));
}

#[test]
fn update_summary_exposes_diff() {
    let s = Summary::update(
        record(json!({"a": 1})),
        record(json!({"a": 2})),
        record(json!({"a": 2})),
        record(json!({"a": 2})),
    );
    assert!(s.is_update());
    assert_eq!(s.previous_values().unwrap()["a"], json!(1));
    assert_eq!(s.changes().unwrap()["a"], json!(2));
}

#[test]
fn accessors_read_context() {
    let s = Summary::creation(
        record(json!({"name": "ink", "price": 2.5, "gone": null})),
        Record::new(),
    );
    assert_eq!(s.get_str("name"), Some("ink"));
    assert_eq!(s.get_f64("price"), Some(2.5));
    assert!(s.is_null("gone"));
    assert!(s.is_null("missing"));
    assert!(!s.is_null("name"));
}

#[test]
fn clones_share_records() {
    let s = Summary::creation(record(json!({"a": 1})), Record::new())
        .with_ctx_options(Arc::new(record(json!({"user": "root"}))));
    let copy = s.clone();
    assert_eq!(copy.ctx_options()["user"], json!("root"));
    assert_eq!(copy.context(), s.context());
}

#[test]
fn operation_display() {
    assert_eq!(Operation::Creation.to_string(), "creation");
    assert_eq!(Operation::Update.to_string(), "update");
}
