//! The read-only operation snapshot.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Which kind of operation produced a [`Summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `create` or `clone`.
    Creation,
    /// `update`.
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation => f.write_str("creation"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// A snapshot of an in-flight operation.
///
/// Handed to validators, sanitizers, resolvers, gating predicates and
/// lifecycle handlers. It exposes no mutating methods and its records are
/// shared behind `Arc`, so cloning is cheap and no holder can change what
/// another holder sees.
///
/// - `context` holds every resolved value including virtual properties
///   (keyed by their declared name, never by alias)
/// - `values` is `context` without virtual properties
/// - `changes` is `None` for creation and the partial diff for update
#[derive(Debug, Clone)]
pub struct Summary {
    operation: Operation,
    previous_values: Option<Arc<Record>>,
    values: Arc<Record>,
    changes: Option<Arc<Record>>,
    context: Arc<Record>,
    ctx_options: Arc<Record>,
}

impl Summary {
    /// Snapshot of a creation (create or clone).
    pub fn creation(context: Record, values: Record) -> Self {
        Self {
            operation: Operation::Creation,
            previous_values: None,
            values: Arc::new(values),
            changes: None,
            context: Arc::new(context),
            ctx_options: Arc::default(),
        }
    }

    /// Snapshot of an update.
    pub fn update(previous_values: Record, context: Record, values: Record, changes: Record) -> Self {
        Self {
            operation: Operation::Update,
            previous_values: Some(Arc::new(previous_values)),
            values: Arc::new(values),
            changes: Some(Arc::new(changes)),
            context: Arc::new(context),
            ctx_options: Arc::default(),
        }
    }

    /// Attaches caller-supplied contextual options.
    #[must_use]
    pub fn with_ctx_options(mut self, ctx_options: Arc<Record>) -> Self {
        self.ctx_options = ctx_options;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_update(&self) -> bool {
        self.operation == Operation::Update
    }

    pub fn previous_values(&self) -> Option<&Record> {
        self.previous_values.as_deref()
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn changes(&self) -> Option<&Record> {
        self.changes.as_deref()
    }

    pub fn context(&self) -> &Record {
        &self.context
    }

    /// Options passed by the caller of the operation (`ctxOptions`).
    pub fn ctx_options(&self) -> &Record {
        &self.ctx_options
    }

    /// Looks up a key in the context.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Extract a string value from the context.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Extract a boolean value from the context.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Extract a numeric value from the context.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Returns true if `key` is absent from the context or null.
    pub fn is_null(&self, key: &str) -> bool {
        self.get(key).is_none_or(Value::is_null)
    }
}
