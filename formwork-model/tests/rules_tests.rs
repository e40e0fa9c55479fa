use formwork_model::{classify, Category, Keyword, PropertyDefinition, Requirement};
use serde_json::Value;

fn validated() -> PropertyDefinition {
    PropertyDefinition::new().validator(|_: &Value, _| true)
}

// ── Classification ───────────────────────────────────────────────

#[test]
fn classifies_each_category() {
    assert_eq!(classify(&PropertyDefinition::new().constant().value(1)), Category::Constant);
    assert_eq!(
        classify(&PropertyDefinition::new().dependent().default(0)),
        Category::Dependent
    );
    assert_eq!(classify(&validated().as_virtual()), Category::Virtual);
    assert_eq!(classify(&validated().readonly()), Category::Readonly);
    assert_eq!(classify(&PropertyDefinition::new().readonly_lax().default("")), Category::ReadonlyLax);
    assert_eq!(classify(&validated().required(true)), Category::Required);
    assert_eq!(
        classify(&validated().default(0).required_when(|_| false)),
        Category::RequiredBy
    );
    assert_eq!(classify(&PropertyDefinition::new().default(0)), Category::Lax);
}

#[test]
fn constant_takes_precedence_over_everything() {
    let definition = PropertyDefinition::new()
        .constant()
        .value(1)
        .dependent()
        .as_virtual()
        .readonly();
    assert_eq!(classify(&definition), Category::Constant);
}

#[test]
fn dependent_takes_precedence_over_readonly() {
    let definition = PropertyDefinition::new().dependent().readonly().default(0);
    assert_eq!(classify(&definition), Category::Dependent);
}

#[test]
fn readonly_lax_takes_precedence_over_required() {
    let definition = PropertyDefinition::new().readonly_lax().required(true);
    assert_eq!(classify(&definition), Category::ReadonlyLax);
}

// ── Category table ───────────────────────────────────────────────

#[test]
fn category_names_use_schema_spelling() {
    assert_eq!(Category::ReadonlyLax.to_string(), "readonly-lax");
    assert_eq!(Category::RequiredBy.name(), "required-by");
    assert_eq!(Keyword::DependsOn.to_string(), "dependsOn");
    assert_eq!(Keyword::ShouldInit.name(), "shouldInit");
}

#[test]
fn only_virtuals_are_not_persisted() {
    for category in [
        Category::Constant,
        Category::Dependent,
        Category::Lax,
        Category::Readonly,
        Category::ReadonlyLax,
        Category::Required,
        Category::RequiredBy,
    ] {
        assert!(category.is_persisted(), "{category}");
    }
    assert!(!Category::Virtual.is_persisted());
}

#[test]
fn constants_and_dependents_do_not_accept_input() {
    assert!(!Category::Constant.accepts_input());
    assert!(!Category::Dependent.accepts_input());
    assert!(Category::Virtual.accepts_input());
    assert!(Category::Lax.accepts_input());
}

#[test]
fn alias_is_only_allowed_on_virtuals() {
    assert!(Category::Virtual.allowed().contains(&Keyword::Alias));
    assert!(!Category::Lax.allowed().contains(&Keyword::Alias));
    assert!(!Category::Dependent.allowed().contains(&Keyword::Alias));
}

#[test]
fn dependents_cannot_gate_initialization() {
    assert!(!Category::Dependent.allowed().contains(&Keyword::ShouldInit));
    assert!(!Category::Dependent.allowed().contains(&Keyword::ShouldUpdate));
}

// ── Keywords ─────────────────────────────────────────────────────

#[test]
fn keywords_lists_declared_rules_in_canonical_order() {
    let definition = PropertyDefinition::new()
        .validator(|_: &Value, _| true)
        .default(1)
        .should_update(false)
        .on_success(|_| Ok(()));
    assert_eq!(
        definition.keywords(),
        vec![
            Keyword::Default,
            Keyword::OnSuccess,
            Keyword::ShouldUpdate,
            Keyword::Validator
        ]
    );
}

#[test]
fn requirement_conversions() {
    assert_eq!(Requirement::from(true).message, None);
    let requirement = Requirement::from((true, "needed"));
    assert!(requirement.required);
    assert_eq!(requirement.message.as_deref(), Some("needed"));
}
