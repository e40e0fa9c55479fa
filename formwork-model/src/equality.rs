//! Change detector.
//!
//! Decides whether an update candidate differs from the stored value.
//! Scalars compare strictly. Objects must share a key set and arrays a
//! length. Nested containers are compared element-wise while `depth`
//! remains; past it only their shape (key set or length) is compared.
//! Key order never matters.

use serde_json::Value;

/// Whether `a` and `b` are equal when looking `depth` levels into nested
/// containers.
///
/// ```
/// use formwork_model::is_equal;
/// use serde_json::json;
///
/// let before = json!({ "a": { "b": 1 } });
/// let after = json!({ "a": { "b": 2 } });
/// assert!(is_equal(&before, &after, 0));
/// assert!(!is_equal(&before, &after, 1));
/// ```
pub fn is_equal(a: &Value, b: &Value, depth: usize) -> bool {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, l)| {
                    right
                        .get(key)
                        .is_some_and(|r| nested_equal(l, r, depth))
                })
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(l, r)| nested_equal(l, r, depth))
        }
        _ => a == b,
    }
}

fn nested_equal(a: &Value, b: &Value, depth: usize) -> bool {
    match (a, b) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            if depth == 0 {
                same_shape(a, b)
            } else {
                is_equal(a, b, depth - 1)
            }
        }
        _ => a == b,
    }
}

fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len() && left.keys().all(|k| right.contains_key(k))
        }
        (Value::Array(left), Value::Array(right)) => left.len() == right.len(),
        _ => false,
    }
}
