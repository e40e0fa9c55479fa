//! Schema-level options.
//!
//! Options are usually built in code. The data-only subset can also be
//! loaded from JSON with [`SchemaOptions::from_value`], which reports every
//! unknown key and malformed value in one [`SchemaDefinitionError`].

use crate::compiler::DefinitionErrors;
use crate::functions::{async_handler_fn, handler_fn, Handler};
use crate::property::Gate;
use formwork_types::{Record, SchemaResult, Summary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_CREATED_AT: &str = "createdAt";
pub const DEFAULT_UPDATED_AT: &str = "updatedAt";
pub const DEFAULT_EQUALITY_DEPTH: usize = 1;

/// How runtime failures reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Failures come back inside `Ok(outcome)` with `outcome.error()` set.
    #[default]
    Silent,
    /// Failures come back as `Err(..)`.
    Throw,
}

/// Which timestamp keys are stamped, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timestamps {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Timestamps {
    /// `timestamps: true`.
    pub fn enabled() -> Self {
        Self::named(Some(DEFAULT_CREATED_AT), Some(DEFAULT_UPDATED_AT))
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Custom key names; `None` disables that stamp.
    pub fn named(created_at: Option<&str>, updated_at: Option<&str>) -> Self {
        Self {
            created_at: created_at.map(str::to_string),
            updated_at: updated_at.map(str::to_string),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.created_at.is_some() || self.updated_at.is_some()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.created_at
            .as_deref()
            .into_iter()
            .chain(self.updated_at.as_deref())
    }
}

/// Options applied to every operation of a schema.
#[derive(Clone)]
pub struct SchemaOptions {
    pub errors: ErrorMode,
    pub timestamps: Timestamps,
    /// Nesting depth used by the change detector.
    pub equality_depth: usize,
    /// Global update gate evaluated before any property.
    pub should_update: Option<Gate>,
    pub set_missing_defaults_on_update: bool,
    pub on_success: Vec<Arc<dyn Handler<Summary>>>,
    pub on_delete: Vec<Arc<dyn Handler<Record>>>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            errors: ErrorMode::Silent,
            timestamps: Timestamps::disabled(),
            equality_depth: DEFAULT_EQUALITY_DEPTH,
            should_update: None,
            set_missing_defaults_on_update: false,
            on_success: Vec::new(),
            on_delete: Vec::new(),
        }
    }
}

impl fmt::Debug for SchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaOptions")
            .field("errors", &self.errors)
            .field("timestamps", &self.timestamps)
            .field("equality_depth", &self.equality_depth)
            .field("should_update", &self.should_update)
            .field("set_missing_defaults_on_update", &self.set_missing_defaults_on_update)
            .field("on_success", &self.on_success.len())
            .field("on_delete", &self.on_delete.len())
            .finish()
    }
}

impl SchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(mut self, mode: ErrorMode) -> Self {
        self.errors = mode;
        self
    }

    pub fn timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn equality_depth(mut self, depth: usize) -> Self {
        self.equality_depth = depth;
        self
    }

    pub fn should_update(mut self, allowed: bool) -> Self {
        self.should_update = Some(Gate::Bool(allowed));
        self
    }

    pub fn should_update_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> bool + Send + Sync + 'static,
    {
        self.should_update = Some(Gate::When(Arc::new(f)));
        self
    }

    pub fn set_missing_defaults_on_update(mut self, enabled: bool) -> Self {
        self.set_missing_defaults_on_update = enabled;
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_success.push(handler_fn(f));
        self
    }

    pub fn on_success_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Summary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_success.push(async_handler_fn(f));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_delete.push(handler_fn(f));
        self
    }

    /// Loads the data-only options from JSON.
    ///
    /// Recognized keys: `errors`, `timestamps`, `equalityDepth`,
    /// `shouldUpdate` (boolean form), `setMissingDefaultsOnUpdate`. Handler
    /// options and the error tool must be attached in code.
    pub fn from_value(value: &Value) -> SchemaResult<Self> {
        let mut errors = DefinitionErrors::default();
        let mut options = Self::default();

        let Some(object) = value.as_object() else {
            errors.add("options", "Schema options must be an object");
            return errors.finish(options);
        };

        for (key, value) in object {
            match key.as_str() {
                "errors" => match value.as_str() {
                    Some("silent") => options.errors = ErrorMode::Silent,
                    Some("throw") => options.errors = ErrorMode::Throw,
                    _ => errors.add(key, "'errors' must either be 'silent' or 'throw'"),
                },
                "timestamps" => match parse_timestamps(value) {
                    Ok(timestamps) => options.timestamps = timestamps,
                    Err(messages) => {
                        for message in messages {
                            errors.add(key, message);
                        }
                    }
                },
                "equalityDepth" => match value.as_u64().and_then(|d| usize::try_from(d).ok()) {
                    Some(depth) => options.equality_depth = depth,
                    None => errors.add(key, "'equalityDepth' must be a number >= 0"),
                },
                "shouldUpdate" => match value.as_bool() {
                    Some(allowed) => options.should_update = Some(Gate::Bool(allowed)),
                    None => errors.add(key, "'shouldUpdate' must either be a boolean or a predicate"),
                },
                "setMissingDefaultsOnUpdate" => match value.as_bool() {
                    Some(enabled) => options.set_missing_defaults_on_update = enabled,
                    None => errors.add(key, "'setMissingDefaultsOnUpdate' must be a boolean"),
                },
                "onSuccess" | "onDelete" | "ErrorTool" => {
                    errors.add(key, format!("'{key}' cannot be loaded from data; attach it in code"));
                }
                _ => errors.add(key, format!("'{key}' is not a valid schema option")),
            }
        }

        errors.finish(options)
    }
}

fn parse_timestamps(value: &Value) -> Result<Timestamps, Vec<String>> {
    if let Some(enabled) = value.as_bool() {
        return Ok(if enabled {
            Timestamps::enabled()
        } else {
            Timestamps::disabled()
        });
    }

    let Some(object) = value.as_object() else {
        return Err(vec!["'timestamps' must either be a boolean or an object".to_string()]);
    };

    let mut messages = Vec::new();
    let mut timestamps = Timestamps::enabled();
    for (key, value) in object {
        let slot = match key.as_str() {
            "createdAt" => &mut timestamps.created_at,
            "updatedAt" => &mut timestamps.updated_at,
            _ => {
                messages.push(format!("'{key}' is not a valid timestamp option"));
                continue;
            }
        };
        match value {
            Value::Bool(false) => *slot = None,
            Value::String(name) => *slot = Some(name.clone()),
            _ => messages.push(format!("'{key}' must either be a string or false")),
        }
    }

    if messages.is_empty() {
        Ok(timestamps)
    } else {
        Err(messages)
    }
}

/// Semantic checks on options, run with the property names known.
pub(crate) fn check(options: &SchemaOptions, is_property: impl Fn(&str) -> bool, errors: &mut DefinitionErrors) {
    let Timestamps {
        created_at,
        updated_at,
    } = &options.timestamps;

    for name in [created_at, updated_at].into_iter().flatten() {
        if name.trim().is_empty() {
            errors.add("timestamps", "Timestamp keys cannot be empty");
        } else if is_property(name) {
            errors.add("timestamps", format!("'{name}' already belongs to a property of the schema"));
        }
    }

    if let (Some(created), Some(updated)) = (created_at, updated_at) {
        if created == updated {
            errors.add("timestamps", "createdAt and updatedAt cannot share the same key");
        }
    }
}
