//! Property resolver.
//!
//! Runs the sanitize → validate pipeline for input-accepting properties,
//! evaluates conditional requirements, and resolves dependents in graph
//! order. Failures go to the operation's [`ErrorTool`].

use crate::compiler::{CompiledProperty, CompiledSchema};
use crate::context::OperationContext;
use crate::equality::is_equal;
use crate::functions::ValidatorResponse;
use crate::property::Required;
use formwork_types::{ErrorTool, FieldError};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const VALIDATION_FAILED: &str = "validation failed";

/// Outcome of running one value through its sanitizer and validator.
#[derive(Debug)]
pub(crate) enum Verdict {
    Valid(Value),
    Invalid {
        error: FieldError,
        other_reasons: BTreeMap<String, Vec<String>>,
    },
}

/// Sanitizes then validates `raw` as the value of `property`.
///
/// The sanitizer sees `raw` in the context under the property's name; the
/// validator receives the sanitized value. Properties without a validator
/// accept the sanitized value as is.
pub(crate) async fn evaluate(
    property: &CompiledProperty,
    raw: Value,
    ctx: &OperationContext<'_>,
) -> Verdict {
    let definition = &property.definition;
    let value = match &definition.sanitizer {
        Some(sanitizer) => {
            sanitizer
                .resolve(&ctx.summary_with(&property.name, &raw))
                .await
        }
        None => raw,
    };

    let Some(validator) = &definition.validator else {
        return Verdict::Valid(value);
    };

    let summary = ctx.summary_with(&property.name, &value);
    match validator.validate(&value, &summary).await {
        ValidatorResponse::Valid { validated } => Verdict::Valid(validated.unwrap_or(value)),
        ValidatorResponse::Invalid {
            reasons,
            metadata,
            other_reasons,
        } => {
            let mut error = if reasons.is_empty() {
                FieldError::new(VALIDATION_FAILED)
            } else {
                FieldError::with_reasons(reasons)
            };
            error.metadata = metadata;
            Verdict::Invalid {
                error,
                other_reasons,
            }
        }
    }
}

/// Validates every admitted input in declaration order, committing accepted
/// values to the context so later validators observe them. Rejected values
/// stay in the context as supplied. Returns the accepted properties.
pub(crate) async fn validate_admitted<'a, T: ErrorTool>(
    ctx: &mut OperationContext<'a>,
    tool: &mut T,
) -> Vec<&'a CompiledProperty> {
    let mut accepted = Vec::new();

    for property in ctx.admitted() {
        let raw = ctx.get(&property.name).cloned().unwrap_or(Value::Null);
        match evaluate(property, raw, ctx).await {
            Verdict::Valid(value) => {
                ctx.set(&property.name, value);
                accepted.push(property);
            }
            Verdict::Invalid {
                error,
                other_reasons,
            } => {
                debug!(property = %property.name, reasons = ?error.reasons, "Value rejected");
                tool.add(&ctx.error_key(&property.name), error);
                route_other_reasons(ctx.schema(), tool, &property.name, other_reasons);
            }
        }
    }
    accepted
}

/// Attaches a validator's `otherReasons` to sibling fields. Reasons for keys
/// that cannot carry errors are dropped.
pub(crate) fn route_other_reasons<T: ErrorTool>(
    schema: &CompiledSchema,
    tool: &mut T,
    owner: &str,
    other_reasons: BTreeMap<String, Vec<String>>,
) {
    for (field, reasons) in other_reasons {
        if reasons.is_empty() {
            continue;
        }
        if schema.is_error_key(&field) {
            tool.add(&field, FieldError::with_reasons(reasons));
        } else {
            warn!(property = %owner, field = %field, "Dropped reasons for a field that cannot carry errors");
        }
    }
}

/// Evaluates every conditional `required` predicate against one snapshot
/// and reports the properties that are required but missing.
pub(crate) async fn check_requirements<T: ErrorTool>(
    ctx: &OperationContext<'_>,
    tool: &mut T,
    depth: usize,
) {
    let summary = ctx.summary();

    for property in &ctx.schema().properties {
        let Some(Required::When(predicate)) = &property.definition.required else {
            continue;
        };
        let requirement = predicate(&summary);
        if !requirement.required || !is_missing(property, ctx, depth).await {
            continue;
        }
        let message = requirement
            .message
            .unwrap_or_else(|| required_message(&property.name));
        tool.add(&property.name, FieldError::new(message));
    }
}

/// On creation a property is missing when no input was admitted. On update
/// it is missing when no change was admitted and it still holds its default.
async fn is_missing(property: &CompiledProperty, ctx: &OperationContext<'_>, depth: usize) -> bool {
    if ctx.is_admitted(&property.name) {
        return false;
    }
    if !ctx.is_update() {
        return true;
    }
    match &property.definition.default {
        Some(default) => {
            let default = default.evaluate(&ctx.summary()).await;
            let current = ctx.get(&property.name).unwrap_or(&Value::Null);
            is_equal(current, &default, depth)
        }
        None => true,
    }
}

pub(crate) fn required_message(name: &str) -> String {
    format!("'{name}' is required!")
}

/// The property's default, computed against the current snapshot.
pub(crate) async fn default_value(
    property: &CompiledProperty,
    ctx: &OperationContext<'_>,
) -> Option<Value> {
    match &property.definition.default {
        Some(setter) => Some(setter.evaluate(&ctx.summary()).await),
        None => None,
    }
}

/// Resolves dependents in evaluation order. A dependent is resolved when at
/// least one of its sources is active; a readonly dependent is re-resolved on
/// update only while it still holds its default.
pub(crate) async fn resolve_dependents(ctx: &mut OperationContext<'_>, depth: usize) {
    let schema = ctx.schema();

    for name in schema.graph.evaluation_order() {
        let Some(property) = schema.property(name) else {
            continue;
        };
        let Some(resolver) = &property.definition.resolver else {
            continue;
        };
        if !schema.graph.sources_of(name).iter().any(|s| ctx.is_active(s)) {
            continue;
        }

        if ctx.is_update() && property.definition.readonly.is_some() {
            let default = default_value(property, ctx).await.unwrap_or(Value::Null);
            let current = ctx.get(name).unwrap_or(&Value::Null);
            if !is_equal(current, &default, depth) {
                continue;
            }
        }

        let value = resolver.resolve(&ctx.summary()).await;

        if ctx.is_update() {
            let previous = ctx.previous(name).unwrap_or(&Value::Null);
            if is_equal(previous, &value, depth) {
                continue;
            }
            ctx.record_change(name, value);
        } else {
            ctx.set(name, value);
        }
        ctx.activate(name);
    }
}
