use formwork_model::{
    ErrorMode, PropertyDefinition, Record, Schema, SchemaOptions, Summary, Timestamps,
    ValidatorResponse,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn profile() -> Schema {
    Schema::builder()
        .property("id", PropertyDefinition::new().constant().value(1))
        .property(
            "name",
            PropertyDefinition::new()
                .required(true)
                .validator(|value, _| value.as_str().is_some_and(|s| !s.is_empty())),
        )
        .property(
            "username",
            PropertyDefinition::new()
                .readonly()
                .validator(|value, _| value.is_string()),
        )
        .property("nickname", PropertyDefinition::new().readonly_lax().default(""))
        .property(
            "plan",
            PropertyDefinition::new()
                .readonly()
                .default("free")
                .should_init(false)
                .validator(|value, _| value.is_string()),
        )
        .property(
            "bio",
            PropertyDefinition::new().default("").should_update(false),
        )
        .property(
            "status",
            PropertyDefinition::new()
                .default("active")
                .should_update_when(|s| s.get_str("name") != Some("root")),
        )
        .build()
        .unwrap()
}

fn stored_profile() -> Value {
    json!({
        "id": 1,
        "name": "Ada",
        "username": "ada",
        "nickname": "",
        "plan": "free",
        "bio": "",
        "status": "active",
    })
}

fn inventory() -> Schema {
    Schema::builder()
        .property(
            "setQuantity",
            PropertyDefinition::new()
                .as_virtual()
                .alias("qty")
                .validator(|value, _| value.is_u64()),
        )
        .property(
            "quantity",
            PropertyDefinition::new()
                .dependent()
                .default(0)
                .depends_on(["setQuantity"])
                .resolver(|s| s.get("setQuantity").cloned().unwrap_or_default()),
        )
        .build()
        .unwrap()
}

// ── Nothing to update ────────────────────────────────────────────

#[tokio::test]
async fn empty_changes_are_nothing_to_update() {
    let outcome = profile().model().update(stored_profile(), json!({})).await.unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
    assert!(outcome.data().is_none());
}

#[tokio::test]
async fn equal_values_are_nothing_to_update() {
    let outcome = profile()
        .model()
        .update(stored_profile(), json!({"name": "Ada", "bio": ""}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn constants_and_unknown_keys_are_ignored() {
    let outcome = profile()
        .model()
        .update(stored_profile(), json!({"id": 2, "colour": "red"}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn nothing_to_update_is_thrown_in_throw_mode() {
    let schema = Schema::builder()
        .property("a", PropertyDefinition::new().default(0))
        .options(SchemaOptions::new().errors(ErrorMode::Throw))
        .build()
        .unwrap();
    let error = schema.model().update(json!({"a": 0}), json!({})).await.unwrap_err();
    assert!(error.is_nothing_to_update());
}

// ── Effective changes ────────────────────────────────────────────

#[tokio::test]
async fn data_is_the_partial_diff() {
    let outcome = profile()
        .model()
        .update(stored_profile(), json!({"name": "Grace", "bio": "x"}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"name": "Grace"}))));

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.changes(), Some(&record(json!({"name": "Grace"}))));
    assert_eq!(summary.values()["name"], json!("Grace"));
    assert_eq!(summary.values()["username"], json!("ada"));
    assert_eq!(summary.previous_values().unwrap()["name"], json!("Ada"));
}

#[tokio::test]
async fn strict_readonly_never_changes() {
    let outcome = profile()
        .model()
        .update(stored_profile(), json!({"username": "grace"}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn readonly_with_blocked_init_changes_once_from_default() {
    let model = profile().model();
    let outcome = model
        .update(stored_profile(), json!({"plan": "pro"}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"plan": "pro"}))));

    let mut upgraded = stored_profile();
    upgraded["plan"] = json!("pro");
    let outcome = model.update(upgraded, json!({"plan": "team"})).await.unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn readonly_lax_changes_while_default() {
    let model = profile().model();
    let outcome = model
        .update(stored_profile(), json!({"nickname": "countess"}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"nickname": "countess"}))));

    let mut named = stored_profile();
    named["nickname"] = json!("countess");
    let outcome = model.update(named, json!({"nickname": "ada"})).await.unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn should_update_gates_properties() {
    let model = profile().model();
    let outcome = model
        .update(stored_profile(), json!({"status": "away"}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"status": "away"}))));

    let mut root = stored_profile();
    root["name"] = json!("root");
    let outcome = model.update(root, json!({"status": "away"})).await.unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn global_gate_short_circuits() {
    let schema = Schema::builder()
        .property("a", PropertyDefinition::new().default(0))
        .options(SchemaOptions::new().should_update_when(|s| s.get("locked").is_none()))
        .build()
        .unwrap();
    let model = schema.model();

    let outcome = model.update(json!({"a": 0}), json!({"a": 1})).await.unwrap();
    assert!(outcome.is_success());

    let outcome = model
        .update(json!({"a": 0, "locked": true}), json!({"a": 1}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn validation_failure_on_update() {
    let outcome = profile()
        .model()
        .update(stored_profile(), json!({"name": ""}))
        .await
        .unwrap();
    let error = outcome.error().unwrap();
    assert!(error.is_validation_error());
    assert_eq!(error.reasons("name"), ["validation failed"]);
}

#[tokio::test]
async fn sanitized_value_equal_to_previous_is_not_a_change() {
    let schema = Schema::builder()
        .property(
            "name",
            PropertyDefinition::new()
                .default("")
                .sanitizer(|s| json!(s.get_str("name").unwrap_or_default().trim())),
        )
        .build()
        .unwrap();
    let outcome = schema
        .model()
        .update(json!({"name": "Ada"}), json!({"name": " Ada "}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn non_object_previous_is_invalid_data() {
    let outcome = profile().model().update(json!("x"), json!({})).await.unwrap();
    assert!(outcome.error().unwrap().is_invalid_data());
}

// ── Virtuals and dependents ──────────────────────────────────────

#[tokio::test]
async fn alias_drives_dependent_on_update() {
    let outcome = inventory()
        .model()
        .update(json!({"quantity": 12}), json!({"qty": 20}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"quantity": 20}))));
}

#[tokio::test]
async fn dependent_resolving_to_same_value_is_nothing_to_update() {
    let outcome = inventory()
        .model()
        .update(json!({"quantity": 12}), json!({"qty": 12}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn readonly_dependent_only_resolves_while_default() {
    let schema = Schema::builder()
        .property("email", PropertyDefinition::new().default(""))
        .property(
            "firstEmail",
            PropertyDefinition::new()
                .dependent()
                .readonly()
                .default("")
                .depends_on(["email"])
                .resolver(|s| s.get("email").cloned().unwrap_or_default()),
        )
        .build()
        .unwrap();
    let model = schema.model();

    let outcome = model
        .update(json!({"email": "", "firstEmail": ""}), json!({"email": "a@x.io"}))
        .await
        .unwrap();
    assert_eq!(
        outcome.data(),
        Some(&record(json!({"email": "a@x.io", "firstEmail": "a@x.io"})))
    );

    let outcome = model
        .update(
            json!({"email": "a@x.io", "firstEmail": "a@x.io"}),
            json!({"email": "b@x.io"}),
        )
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"email": "b@x.io"}))));
}

// ── Summaries seen during an update ──────────────────────────────

type Seen = Arc<Mutex<Vec<(&'static str, Summary)>>>;

fn seen(seen: &Seen) -> Vec<(&'static str, Summary)> {
    seen.lock().unwrap().clone()
}

/// `name` is validated, `bio` is gated, and the schema gate only lets
/// updates through that touch `name`. Every callback records its summary.
fn journal(seen: &Seen) -> Schema {
    let on_validate = Arc::clone(seen);
    let on_gate = Arc::clone(seen);
    let on_global = Arc::clone(seen);
    Schema::builder()
        .property(
            "name",
            PropertyDefinition::new()
                .required(true)
                .validator(move |value: &Value, s: &Summary| {
                    on_validate.lock().unwrap().push(("validator", s.clone()));
                    value.is_string()
                }),
        )
        .property(
            "bio",
            PropertyDefinition::new()
                .default("")
                .should_update_when(move |s: &Summary| {
                    on_gate.lock().unwrap().push(("gate", s.clone()));
                    true
                }),
        )
        .options(SchemaOptions::new().should_update_when(move |s: &Summary| {
            on_global.lock().unwrap().push(("global", s.clone()));
            s.changes().is_some_and(|c| c.contains_key("name"))
        }))
        .build()
        .unwrap()
}

fn merged(previous: &Record, changes: &Record) -> Record {
    let mut values = previous.clone();
    values.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
    values
}

#[tokio::test]
async fn gates_keyed_on_changes_let_real_changes_through() {
    let log = Seen::default();
    let outcome = journal(&log)
        .model()
        .update(json!({"name": "a"}), json!({"name": "b"}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"name": "b"}))));

    let validated = seen(&log)
        .into_iter()
        .find(|(label, _)| *label == "validator")
        .map(|(_, s)| s)
        .unwrap();
    assert_eq!(validated.changes(), Some(&record(json!({"name": "b"}))));
}

#[tokio::test]
async fn callbacks_see_values_as_previous_plus_changes() {
    let log = Seen::default();
    let outcome = journal(&log)
        .model()
        .update(json!({"name": "Ada", "bio": ""}), json!({"name": "Grace", "bio": "hi"}))
        .await
        .unwrap();
    assert!(outcome.is_success());

    let entries = seen(&log);
    let labels: Vec<_> = entries.iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, ["global", "gate", "validator"]);

    for (label, summary) in &entries {
        let previous = summary.previous_values().unwrap();
        let changes = summary.changes().unwrap();
        assert_eq!(previous, &record(json!({"name": "Ada", "bio": ""})), "{label}");
        assert_eq!(changes, &record(json!({"name": "Grace", "bio": "hi"})), "{label}");
        assert_eq!(summary.values(), &merged(previous, changes), "{label}");
    }
}

#[tokio::test]
async fn unchanged_proposals_are_not_pending_changes() {
    let log = Seen::default();
    let outcome = journal(&log)
        .model()
        .update(json!({"name": "Ada", "bio": ""}), json!({"bio": ""}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());

    let entries = seen(&log);
    assert_eq!(entries.len(), 1);
    let (label, summary) = &entries[0];
    assert_eq!(*label, "global");
    assert_eq!(summary.changes(), Some(&Record::new()));
    assert_eq!(summary.values(), summary.previous_values().unwrap());
}

// ── Requirements ─────────────────────────────────────────────────

fn book() -> Schema {
    Schema::builder()
        .property("isPublished", PropertyDefinition::new().default(false))
        .property(
            "price",
            PropertyDefinition::new()
                .default(Value::Null)
                .required_when(|s| {
                    (
                        s.get_bool("isPublished") == Some(true) && s.is_null("price"),
                        "A price is required to publish a book!",
                    )
                })
                .validator(|value, _| {
                    if value.is_number() {
                        ValidatorResponse::valid()
                    } else {
                        ValidatorResponse::invalid("price must be a number")
                    }
                }),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn conditional_requirement_applies_on_update() {
    let outcome = book()
        .model()
        .update(json!({"isPublished": false, "price": null}), json!({"isPublished": true}))
        .await
        .unwrap();
    let error = outcome.error().unwrap();
    assert_eq!(error.reasons("price"), ["A price is required to publish a book!"]);
}

#[tokio::test]
async fn conditional_requirement_is_met_by_stored_value() {
    let outcome = book()
        .model()
        .update(json!({"isPublished": false, "price": 10}), json!({"isPublished": true}))
        .await
        .unwrap();
    assert_eq!(outcome.data(), Some(&record(json!({"isPublished": true}))));
}

// ── Change detection depth ───────────────────────────────────────

#[tokio::test]
async fn equality_depth_zero_ignores_nested_leaves() {
    let schema = Schema::builder()
        .property("meta", PropertyDefinition::new().default(json!({})))
        .options(SchemaOptions::new().equality_depth(0))
        .build()
        .unwrap();
    let model = schema.model();
    let stored = json!({"meta": {"title": "a", "stats": {"views": 1}}});

    let outcome = model
        .update(stored.clone(), json!({"meta": {"title": "a", "stats": {"views": 2}}}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());

    let outcome = model
        .update(stored, json!({"meta": {"title": "b", "stats": {"views": 1}}}))
        .await
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn default_depth_detects_one_level_down() {
    let schema = Schema::builder()
        .property("meta", PropertyDefinition::new().default(json!({})))
        .build()
        .unwrap();
    let outcome = schema
        .model()
        .update(
            json!({"meta": {"stats": {"views": 1}}}),
            json!({"meta": {"stats": {"views": 2}}}),
        )
        .await
        .unwrap();
    assert!(outcome.is_success());
}

// ── Options ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_defaults_are_filled_when_enabled() {
    let schema = Schema::builder()
        .property("id", PropertyDefinition::new().constant().value(7))
        .property("name", PropertyDefinition::new().default(""))
        .property("tags", PropertyDefinition::new().default(json!([])))
        .options(SchemaOptions::new().set_missing_defaults_on_update(true))
        .build()
        .unwrap();
    let outcome = schema
        .model()
        .update(json!({"name": "a"}), json!({"name": "b"}))
        .await
        .unwrap();
    assert_eq!(
        outcome.data(),
        Some(&record(json!({"id": 7, "name": "b", "tags": []})))
    );
}

#[tokio::test]
async fn missing_defaults_alone_are_not_an_update() {
    let schema = Schema::builder()
        .property("name", PropertyDefinition::new().default(""))
        .property("tags", PropertyDefinition::new().default(json!([])))
        .options(SchemaOptions::new().set_missing_defaults_on_update(true))
        .build()
        .unwrap();
    let outcome = schema
        .model()
        .update(json!({"name": "a"}), json!({"name": "a"}))
        .await
        .unwrap();
    assert!(outcome.error().unwrap().is_nothing_to_update());
}

#[tokio::test]
async fn updated_at_is_stamped_and_created_at_kept() {
    let schema = Schema::builder()
        .property("name", PropertyDefinition::new().default(""))
        .options(SchemaOptions::new().timestamps(Timestamps::enabled()))
        .build()
        .unwrap();
    let outcome = schema
        .model()
        .update(
            json!({"name": "a", "createdAt": "2020-01-01T00:00:00.000Z", "updatedAt": "2020-01-01T00:00:00.000Z"}),
            json!({"name": "b", "updatedAt": "never"}),
        )
        .await
        .unwrap();
    let data = outcome.into_data().unwrap();
    assert_eq!(data["name"], json!("b"));
    assert!(!data.contains_key("createdAt"));
    assert_ne!(data["updatedAt"], json!("never"));
    assert_ne!(data["updatedAt"], json!("2020-01-01T00:00:00.000Z"));
}
