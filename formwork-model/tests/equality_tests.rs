use formwork_model::is_equal;
use proptest::prelude::*;
use serde_json::{json, Value};

// ── Scalars and shape ────────────────────────────────────────────

#[test]
fn scalars_compare_strictly() {
    assert!(is_equal(&json!(1), &json!(1), 0));
    assert!(!is_equal(&json!(1), &json!("1"), 5));
    assert!(!is_equal(&json!(null), &json!(false), 5));
}

#[test]
fn key_order_does_not_matter() {
    let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
    assert!(is_equal(&a, &b, 0));
}

#[test]
fn different_key_sets_are_never_equal() {
    assert!(!is_equal(&json!({"a": 1}), &json!({"b": 1}), 0));
    assert!(!is_equal(&json!({"a": {"b": 1}}), &json!({"a": {"c": 1}}), 0));
}

#[test]
fn different_array_lengths_are_never_equal() {
    assert!(!is_equal(&json!([1]), &json!([1, 2]), 0));
    assert!(!is_equal(&json!({"a": [1]}), &json!({"a": [1, 1]}), 0));
}

// ── Depth ────────────────────────────────────────────────────────

#[test]
fn depth_zero_compares_top_level_leaves_only() {
    let before = json!({"title": "a", "meta": {"views": 1}});
    assert!(!is_equal(&before, &json!({"title": "b", "meta": {"views": 1}}), 0));
    assert!(is_equal(&before, &json!({"title": "a", "meta": {"views": 2}}), 0));
}

#[test]
fn each_level_of_depth_looks_one_layer_deeper() {
    let before = json!({"a": {"b": {"c": 1}}});
    let after = json!({"a": {"b": {"c": 2}}});
    assert!(is_equal(&before, &after, 0));
    assert!(is_equal(&before, &after, 1));
    assert!(!is_equal(&before, &after, 2));
}

#[test]
fn arrays_recurse_like_objects() {
    let before = json!([{"a": 1}]);
    let after = json!([{"a": 2}]);
    assert!(is_equal(&before, &after, 0));
    assert!(!is_equal(&before, &after, 1));
}

// ── Properties ───────────────────────────────────────────────────

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn equality_is_reflexive(value in value_strategy(), depth in 0usize..4) {
        prop_assert!(is_equal(&value, &value, depth));
    }

    #[test]
    fn equality_is_symmetric(a in value_strategy(), b in value_strategy(), depth in 0usize..4) {
        prop_assert_eq!(is_equal(&a, &b, depth), is_equal(&b, &a, depth));
    }

    #[test]
    fn deep_enough_matches_structural_equality(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(is_equal(&a, &b, 8), a == b);
    }

    #[test]
    fn inequality_at_low_depth_implies_inequality_deeper(
        a in value_strategy(),
        b in value_strategy(),
        depth in 0usize..3,
    ) {
        if !is_equal(&a, &b, depth) {
            prop_assert!(!is_equal(&a, &b, depth + 1));
        }
    }
}
