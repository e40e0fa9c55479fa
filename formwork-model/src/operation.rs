//! Create, clone and update flows.
//!
//! Each flow allocates a fresh [`OperationContext`], runs the resolver in
//! its fixed phase order and ends in a [`Resolved`] value carrying either the
//! output record or the populated error tool, together with the handlers the
//! outcome should dispatch.

use crate::compiler::{CompiledProperty, CompiledSchema};
use crate::context::OperationContext;
use crate::equality::is_equal;
use crate::lifecycle::{Dispatch, SummaryDispatch};
use crate::resolver::{self, default_value, required_message};
use crate::rules::Category;
use crate::strategy::{Fallback, InitPolicy, UpdatePolicy};
use chrono::{SecondsFormat, Utc};
use formwork_types::{ErrorMessage, ErrorTool, FieldError, Record};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub(crate) enum Resolved<T> {
    Success {
        data: Record,
        handlers: SummaryDispatch,
    },
    Failure {
        tool: T,
        handlers: Option<SummaryDispatch>,
    },
}

impl<T: ErrorTool> Resolved<T> {
    fn rejected(message: ErrorMessage) -> Self {
        Self::Failure {
            tool: T::new(message),
            handlers: None,
        }
    }
}

// ── Creation ─────────────────────────────────────────────────────

pub(crate) async fn create<T: ErrorTool>(
    schema: &CompiledSchema,
    input: Value,
    ctx_options: Arc<Record>,
) -> Resolved<T> {
    let input = match input {
        Value::Object(input) => input,
        Value::Null => Record::new(),
        _ => return Resolved::rejected(ErrorMessage::InvalidData),
    };

    let mut ctx = OperationContext::creation(schema, ctx_options);
    let mut tool = T::new(ErrorMessage::ValidationError);

    admit_input(&mut ctx, input);
    apply_init_gates(&mut ctx);
    seed_fallbacks(&mut ctx, &mut tool, &HashSet::new()).await;

    finish_creation(ctx, tool).await
}

pub(crate) async fn clone<T: ErrorTool>(
    schema: &CompiledSchema,
    entity: Value,
    reset: &[String],
    ctx_options: Arc<Record>,
) -> Resolved<T> {
    let Value::Object(entity) = entity else {
        return Resolved::rejected(ErrorMessage::InvalidData);
    };

    let mut ctx = OperationContext::creation(schema, ctx_options);
    let mut tool = T::new(ErrorMessage::ValidationError);

    // Copied values skip the init gates; reset ones fall back to their default.
    let reset: HashSet<&str> = reset
        .iter()
        .map(String::as_str)
        .filter(|name| {
            schema
                .property(name)
                .is_some_and(|p| p.definition.default.is_some())
        })
        .collect();

    for property in &schema.properties {
        if !property.category.is_persisted()
            || property.category == Category::Constant
            || reset.contains(property.name.as_str())
        {
            continue;
        }
        let Some(value) = entity.get(&property.name) else {
            continue;
        };
        if property.category == Category::Dependent {
            ctx.set(&property.name, value.clone());
        } else {
            ctx.admit(&property.name, &property.name, value.clone());
        }
    }

    let copied: HashSet<&str> = schema
        .properties
        .iter()
        .filter(|p| p.category == Category::Dependent && ctx.get(&p.name).is_some())
        .map(|p| p.name.as_str())
        .collect();
    seed_fallbacks(&mut ctx, &mut tool, &copied).await;

    finish_creation(ctx, tool).await
}

async fn finish_creation<T: ErrorTool>(mut ctx: OperationContext<'_>, mut tool: T) -> Resolved<T> {
    let schema = ctx.schema();

    for property in resolver::validate_admitted(&mut ctx, &mut tool).await {
        ctx.activate(&property.name);
    }
    for property in &schema.properties {
        if !matches!(property.category, Category::Virtual | Category::Dependent) {
            ctx.activate(&property.name);
        }
    }

    resolver::check_requirements(&ctx, &mut tool, schema.options.equality_depth).await;
    if tool.is_loaded() {
        return fail(&ctx, tool);
    }

    resolver::resolve_dependents(&mut ctx, schema.options.equality_depth).await;

    let now = timestamp();
    for key in schema.options.timestamps.keys() {
        ctx.set(key, now.clone());
    }

    let data = ctx.persisted();
    debug!(properties = data.len(), "Entity created");
    Resolved::Success {
        data,
        handlers: success_dispatch(&ctx),
    }
}

/// Fills every property that took no input: constants with their value,
/// others with their default, and records missing required values. Properties
/// in `skip` are left as they are.
async fn seed_fallbacks<T: ErrorTool>(
    ctx: &mut OperationContext<'_>,
    tool: &mut T,
    skip: &HashSet<&str>,
) {
    let schema = ctx.schema();
    for property in &schema.properties {
        if ctx.is_admitted(&property.name) || skip.contains(property.name.as_str()) {
            continue;
        }
        match property.strategy.fallback {
            Fallback::Constant => {
                if let Some(setter) = &property.definition.value {
                    let value = setter.evaluate(&ctx.summary()).await;
                    ctx.set(&property.name, value);
                }
            }
            Fallback::Default => {
                if let Some(value) = default_value(property, ctx).await {
                    ctx.set(&property.name, value);
                }
            }
            Fallback::Required => {
                tool.add(&property.name, FieldError::new(required_message(&property.name)));
            }
            Fallback::Nothing => {}
        }
    }
}

// ── Update ───────────────────────────────────────────────────────

pub(crate) async fn update<T: ErrorTool>(
    schema: &CompiledSchema,
    previous: Value,
    changes: Value,
    ctx_options: Arc<Record>,
) -> Resolved<T> {
    let (Value::Object(previous), Value::Object(changes)) = (previous, changes) else {
        return Resolved::rejected(ErrorMessage::InvalidData);
    };
    let depth = schema.options.equality_depth;

    let mut ctx = OperationContext::update(schema, previous, ctx_options);
    let mut tool = T::new(ErrorMessage::ValidationError);

    admit_input(&mut ctx, changes);

    if let Some(gate) = &schema.options.should_update {
        if !gate.allows(&ctx.summary()) {
            debug!("Update blocked by the schema gate");
            return Resolved::rejected(ErrorMessage::NothingToUpdate);
        }
    }

    for property in ctx.admitted() {
        if !admits_update(property, &ctx, depth).await {
            ctx.reject(&property.name);
        }
    }

    let summary = ctx.summary();
    for property in ctx.admitted() {
        let blocked = property
            .definition
            .should_update
            .as_ref()
            .is_some_and(|gate| !gate.allows(&summary));
        if blocked {
            ctx.reject(&property.name);
        }
    }

    if ctx.admitted().is_empty() {
        debug!("Update rejected: no admissible changes");
        return Resolved::rejected(ErrorMessage::NothingToUpdate);
    }

    for property in resolver::validate_admitted(&mut ctx, &mut tool).await {
        if property.category == Category::Virtual {
            ctx.activate(&property.name);
            continue;
        }
        let value = ctx.get(&property.name).cloned().unwrap_or(Value::Null);
        let previous = ctx.previous(&property.name).cloned().unwrap_or(Value::Null);
        if is_equal(&previous, &value, depth) {
            ctx.set(&property.name, previous);
        } else {
            ctx.record_change(&property.name, value);
            ctx.activate(&property.name);
        }
    }

    resolver::check_requirements(&ctx, &mut tool, depth).await;
    if tool.is_loaded() {
        return fail(&ctx, tool);
    }

    resolver::resolve_dependents(&mut ctx, depth).await;

    if schema.options.set_missing_defaults_on_update && !ctx.changes.is_empty() {
        fill_missing_defaults(&mut ctx).await;
    }

    if ctx.changes.is_empty() {
        debug!("Update rejected: nothing changed");
        return Resolved::rejected(ErrorMessage::NothingToUpdate);
    }

    if let Some(updated_at) = &schema.options.timestamps.updated_at {
        ctx.record_change(updated_at, timestamp());
    }

    let data = ctx.changes.clone();
    debug!(changes = data.len(), "Entity updated");
    Resolved::Success {
        data,
        handlers: success_dispatch(&ctx),
    }
}

/// Whether a proposed change gets past the property's update policy and
/// differs from the stored value.
async fn admits_update(property: &CompiledProperty, ctx: &OperationContext<'_>, depth: usize) -> bool {
    let previous = ctx.previous(&property.name).unwrap_or(&Value::Null);

    let open = match property.strategy.update {
        UpdatePolicy::Never => false,
        UpdatePolicy::Open => true,
        UpdatePolicy::WhileDefault => match default_value(property, ctx).await {
            Some(default) => is_equal(previous, &default, depth),
            None => false,
        },
    };
    if !open {
        return false;
    }
    if property.category == Category::Virtual {
        return true;
    }

    let candidate = ctx.get(&property.name).unwrap_or(&Value::Null);
    !is_equal(previous, candidate, depth)
}

async fn fill_missing_defaults(ctx: &mut OperationContext<'_>) {
    let schema = ctx.schema();
    for property in &schema.properties {
        if !property.category.is_persisted()
            || ctx.previous(&property.name).is_some()
            || ctx.changes.contains_key(&property.name)
        {
            continue;
        }
        let value = match property.strategy.fallback {
            Fallback::Constant => match &property.definition.value {
                Some(setter) => Some(setter.evaluate(&ctx.summary()).await),
                None => None,
            },
            _ => default_value(property, ctx).await,
        };
        if let Some(value) = value {
            ctx.record_change(&property.name, value);
        }
    }
}

// ── Shared phases ────────────────────────────────────────────────

/// Maps caller keys to properties. Keys naming nothing that accepts input
/// (unknown keys, constants, dependents, timestamps) are ignored. When both a
/// virtual's alias and its name are supplied, the alias wins.
fn admit_input(ctx: &mut OperationContext<'_>, input: Record) {
    let schema = ctx.schema();
    for (key, value) in input {
        if schema.is_timestamp_key(&key) {
            continue;
        }
        let Some(property) = schema.lookup_input(&key) else {
            debug!(key = %key, "Ignoring unknown input key");
            continue;
        };
        if !property.category.accepts_input() || property.strategy.init == InitPolicy::Never {
            continue;
        }
        if key == property.name && ctx.is_admitted(&property.name) {
            continue;
        }
        ctx.admit(&property.name, &key, value);
    }
}

/// Evaluates every `shouldInit` gate against one snapshot of the input.
fn apply_init_gates(ctx: &mut OperationContext<'_>) {
    let summary = ctx.summary();
    for property in ctx.admitted() {
        if property.strategy.init != InitPolicy::Gated {
            continue;
        }
        let allowed = property
            .definition
            .should_init
            .as_ref()
            .is_none_or(|gate| gate.allows(&summary));
        if !allowed {
            debug!(property = %property.name, "Initialization blocked");
            ctx.reject(&property.name);
        }
    }
}

fn success_dispatch(ctx: &OperationContext<'_>) -> SummaryDispatch {
    let schema = ctx.schema();
    let mut dispatch = Dispatch::new(ctx.summary());
    for property in &schema.properties {
        let fires = if ctx.is_update() {
            ctx.is_active(&property.name)
        } else {
            property.category != Category::Virtual || ctx.is_active(&property.name)
        };
        if fires {
            dispatch.extend(&property.name, &property.definition.on_success);
        }
    }
    dispatch.extend_global(&schema.options.on_success);
    dispatch
}

fn fail<T: ErrorTool>(ctx: &OperationContext<'_>, tool: T) -> Resolved<T> {
    let schema = ctx.schema();
    let fields = tool.fields();
    let owners: HashSet<&str> = fields
        .iter()
        .filter_map(|field| schema.lookup_input(field))
        .map(|p| p.name.as_str())
        .collect();

    let mut dispatch = Dispatch::new(ctx.summary());
    for property in schema.properties.iter().filter(|p| owners.contains(p.name.as_str())) {
        dispatch.extend(&property.name, &property.definition.on_failure);
    }

    debug!(fields = ?fields, "Operation failed validation");
    Resolved::Failure {
        tool,
        handlers: Some(dispatch),
    }
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}
