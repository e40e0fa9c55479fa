//! The rule table: which definition keywords are legal together.
//!
//! Every property is classified into exactly one [`Category`] by a fixed
//! precedence, then its declared keywords are checked against the category's
//! allowed set and its category-specific requirements. All messages for a
//! property are returned together; the compiler aggregates them across the
//! whole schema.

use crate::property::{Gate, PropertyDefinition, Readonly, Required};
use std::fmt;

/// A definition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    Alias,
    Constant,
    Default,
    Dependent,
    DependsOn,
    OnDelete,
    OnFailure,
    OnSuccess,
    Readonly,
    Required,
    Resolver,
    Sanitizer,
    ShouldInit,
    ShouldUpdate,
    Validator,
    Value,
    Virtual,
}

impl Keyword {
    /// The keyword as written in schema definitions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Constant => "constant",
            Self::Default => "default",
            Self::Dependent => "dependent",
            Self::DependsOn => "dependsOn",
            Self::OnDelete => "onDelete",
            Self::OnFailure => "onFailure",
            Self::OnSuccess => "onSuccess",
            Self::Readonly => "readonly",
            Self::Required => "required",
            Self::Resolver => "resolver",
            Self::Sanitizer => "sanitizer",
            Self::ShouldInit => "shouldInit",
            Self::ShouldUpdate => "shouldUpdate",
            Self::Validator => "validator",
            Self::Value => "value",
            Self::Virtual => "virtual",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The category every property is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Constant,
    Dependent,
    Lax,
    Readonly,
    ReadonlyLax,
    Required,
    RequiredBy,
    Virtual,
}

impl Category {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Dependent => "dependent",
            Self::Lax => "lax",
            Self::Readonly => "readonly",
            Self::ReadonlyLax => "readonly-lax",
            Self::Required => "required",
            Self::RequiredBy => "required-by",
            Self::Virtual => "virtual",
        }
    }

    /// Virtual properties never reach output.
    pub const fn is_persisted(self) -> bool {
        !matches!(self, Self::Virtual)
    }

    /// Whether callers (and validators' `otherReasons`) may address the property.
    pub const fn accepts_input(self) -> bool {
        !matches!(self, Self::Constant | Self::Dependent)
    }

    /// Keywords legal on this category.
    pub fn allowed(self) -> &'static [Keyword] {
        use Keyword as K;
        match self {
            Self::Constant => &[K::Constant, K::OnDelete, K::OnSuccess, K::Value],
            Self::Dependent => &[
                K::Default,
                K::Dependent,
                K::DependsOn,
                K::OnDelete,
                K::OnSuccess,
                K::Readonly,
                K::Resolver,
            ],
            Self::Virtual => &[
                K::Alias,
                K::OnFailure,
                K::OnSuccess,
                K::Required,
                K::Sanitizer,
                K::ShouldInit,
                K::ShouldUpdate,
                K::Validator,
                K::Virtual,
            ],
            Self::Lax => &[
                K::Default,
                K::OnDelete,
                K::OnFailure,
                K::OnSuccess,
                K::Sanitizer,
                K::ShouldInit,
                K::ShouldUpdate,
                K::Validator,
            ],
            Self::Readonly => &[
                K::Default,
                K::OnDelete,
                K::OnFailure,
                K::OnSuccess,
                K::Readonly,
                K::Sanitizer,
                K::ShouldInit,
                K::ShouldUpdate,
                K::Validator,
            ],
            Self::ReadonlyLax => &[
                K::Default,
                K::OnDelete,
                K::OnFailure,
                K::OnSuccess,
                K::Readonly,
                K::Sanitizer,
                K::ShouldUpdate,
                K::Validator,
            ],
            Self::Required => &[
                K::OnDelete,
                K::OnFailure,
                K::OnSuccess,
                K::Required,
                K::Sanitizer,
                K::ShouldUpdate,
                K::Validator,
            ],
            Self::RequiredBy => &[
                K::Default,
                K::OnDelete,
                K::OnFailure,
                K::OnSuccess,
                K::Required,
                K::Sanitizer,
                K::ShouldInit,
                K::ShouldUpdate,
                K::Validator,
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a definition. Precedence: constant, dependent, virtual,
/// readonly-lax, readonly, required-by, required, lax.
pub fn classify(definition: &PropertyDefinition) -> Category {
    if definition.constant {
        Category::Constant
    } else if definition.dependent {
        Category::Dependent
    } else if definition.is_virtual {
        Category::Virtual
    } else if definition.readonly == Some(Readonly::Lax) {
        Category::ReadonlyLax
    } else if definition.readonly == Some(Readonly::Strict) {
        Category::Readonly
    } else {
        match definition.required {
            Some(Required::When(_)) => Category::RequiredBy,
            Some(Required::Bool(_)) => Category::Required,
            None => Category::Lax,
        }
    }
}

/// Checks a single definition against its category. Cross-property rules
/// (aliases, dependency targets, cycles) are checked by the graph builder.
pub(crate) fn check(definition: &PropertyDefinition, category: Category) -> Vec<String> {
    let mut messages = Vec::new();
    let allowed = category.allowed();

    for keyword in definition.keywords() {
        if !allowed.contains(&keyword) {
            messages.push(disallowed_message(keyword, category));
        }
    }

    if let Some(Gate::Bool(true)) = definition.should_init {
        messages.push("'shouldInit' must either be false or a predicate".to_string());
    }
    if let Some(Gate::Bool(true)) = definition.should_update {
        messages.push("'shouldUpdate' must either be false or a predicate".to_string());
    }
    if let Some(Required::Bool(false)) = definition.required {
        messages.push("'required' must either be true or a predicate".to_string());
    }

    let has_default = definition.default.is_some();
    match category {
        Category::Constant => {
            if definition.value.is_none() {
                messages.push("Constant properties must have a value or setter".to_string());
            }
        }
        Category::Dependent => {
            if !has_default {
                messages.push("Dependent properties must have a default value".to_string());
            }
            if definition.depends_on.as_ref().is_none_or(Vec::is_empty) {
                messages.push("Dependent properties must depend on at least one property".to_string());
            }
            if definition.resolver.is_none() {
                messages.push("Dependent properties must have a resolver".to_string());
            }
            if definition.readonly == Some(Readonly::Lax) {
                messages.push("Dependent properties cannot be readonly 'lax'".to_string());
            }
        }
        Category::Virtual => {
            if definition.validator.is_none() {
                messages.push("Virtual properties must have a validator".to_string());
            }
            if matches!(definition.required, Some(Required::Bool(_))) {
                messages.push("Virtual properties can only be required by a predicate".to_string());
            }
        }
        Category::Lax => {
            if !has_default {
                messages.push(
                    "A property should at least be readonly, required, or have a default value"
                        .to_string(),
                );
            }
        }
        Category::Readonly => {
            if definition.should_init.is_some() && !has_default {
                messages.push(
                    "Readonly properties with blocked initialization must have a default value"
                        .to_string(),
                );
            }
            if !has_default && definition.validator.is_none() {
                messages.push("Readonly properties without a default must have a validator".to_string());
            }
        }
        Category::ReadonlyLax => {
            if !has_default {
                messages.push("Readonly 'lax' properties must have a default value".to_string());
            }
        }
        Category::Required => {
            if definition.validator.is_none() {
                messages.push("Required properties must have a validator".to_string());
            }
        }
        Category::RequiredBy => {
            if !has_default {
                messages.push(
                    "Conditionally required properties must have a default value".to_string(),
                );
            }
            if definition.validator.is_none() {
                messages.push("Conditionally required properties must have a validator".to_string());
            }
        }
    }

    messages
}

fn disallowed_message(keyword: Keyword, category: Category) -> String {
    match (category, keyword) {
        (Category::Required, Keyword::Default) => {
            "Required properties cannot have a default value".to_string()
        }
        (Category::Required, Keyword::ShouldInit) => {
            "Required properties cannot have initialization blocked".to_string()
        }
        (Category::Readonly, Keyword::Required) => {
            "Strictly readonly properties are required. Remove the 'required' rule".to_string()
        }
        (Category::ReadonlyLax, Keyword::ShouldInit) => {
            "Readonly 'lax' properties cannot have initialization blocked".to_string()
        }
        _ => format!("'{keyword}' is not allowed on {category} properties"),
    }
}
