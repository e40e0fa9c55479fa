//! Operation context builder.
//!
//! An [`OperationContext`] is allocated per call and owned by it. It holds
//! the progressively resolved values (virtuals included, under their declared
//! names), the update diff, which properties took caller input and under which
//! key, and which properties are active sources for dependents. Callbacks
//! never see it directly: they receive a frozen [`Summary`] snapshot.

use crate::compiler::{CompiledProperty, CompiledSchema};
use crate::equality::is_equal;
use formwork_types::{Operation, Record, Summary};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub(crate) struct OperationContext<'a> {
    schema: &'a CompiledSchema,
    operation: Operation,
    previous: Option<Record>,
    ctx_options: Arc<Record>,
    /// Every value resolved so far.
    pub(crate) values: Record,
    /// Effective changes (update only).
    pub(crate) changes: Record,
    /// property → key the caller used (its name or its alias).
    supplied: HashMap<String, String>,
    active: HashSet<String>,
}

impl<'a> OperationContext<'a> {
    pub(crate) fn creation(schema: &'a CompiledSchema, ctx_options: Arc<Record>) -> Self {
        Self {
            schema,
            operation: Operation::Creation,
            previous: None,
            ctx_options,
            values: Record::new(),
            changes: Record::new(),
            supplied: HashMap::new(),
            active: HashSet::new(),
        }
    }

    /// Seeds the context from the stored entity.
    pub(crate) fn update(
        schema: &'a CompiledSchema,
        previous: Record,
        ctx_options: Arc<Record>,
    ) -> Self {
        Self {
            schema,
            operation: Operation::Update,
            values: previous.clone(),
            previous: Some(previous),
            ctx_options,
            changes: Record::new(),
            supplied: HashMap::new(),
            active: HashSet::new(),
        }
    }

    pub(crate) fn schema(&self) -> &'a CompiledSchema {
        self.schema
    }

    pub(crate) fn is_update(&self) -> bool {
        self.operation == Operation::Update
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub(crate) fn previous(&self, name: &str) -> Option<&Value> {
        self.previous.as_ref().and_then(|p| p.get(name))
    }

    /// Records that `property` took input under `key`.
    pub(crate) fn admit(&mut self, property: &str, key: &str, value: Value) {
        self.supplied.insert(property.to_string(), key.to_string());
        self.set(property, value);
    }

    /// Drops input that a gate rejected, restoring the stored value on update.
    pub(crate) fn reject(&mut self, property: &str) {
        self.supplied.remove(property);
        match self.previous(property).cloned() {
            Some(previous) => self.set(property, previous),
            None => {
                self.values.remove(property);
            }
        }
    }

    pub(crate) fn is_admitted(&self, property: &str) -> bool {
        self.supplied.contains_key(property)
    }

    /// Admitted properties in declaration order.
    pub(crate) fn admitted(&self) -> Vec<&'a CompiledProperty> {
        self.schema
            .properties
            .iter()
            .filter(|p| self.supplied.contains_key(&p.name))
            .collect()
    }

    /// The key errors for `property` are reported under: the alias when the
    /// caller used it, otherwise the declared name.
    pub(crate) fn error_key(&self, property: &str) -> String {
        self.supplied
            .get(property)
            .cloned()
            .unwrap_or_else(|| property.to_string())
    }

    pub(crate) fn activate(&mut self, property: &str) {
        self.active.insert(property.to_string());
    }

    pub(crate) fn is_active(&self, property: &str) -> bool {
        self.active.contains(property)
    }

    pub(crate) fn record_change(&mut self, property: &str, value: Value) {
        self.changes.insert(property.to_string(), value.clone());
        self.set(property, value);
    }

    /// Persisted values: the context without virtual properties.
    pub(crate) fn persisted(&self) -> Record {
        self.persisted_of(&self.values)
    }

    /// A frozen snapshot of the context as it stands.
    pub(crate) fn summary(&self) -> Summary {
        self.snapshot(self.values.clone())
    }

    /// A snapshot in which `property` holds `value`, without committing it.
    pub(crate) fn summary_with(&self, property: &str, value: &Value) -> Summary {
        let mut values = self.values.clone();
        values.insert(property.to_string(), value.clone());
        self.snapshot(values)
    }

    fn snapshot(&self, values: Record) -> Summary {
        let persisted = self.persisted_of(&values);
        let summary = match &self.previous {
            Some(previous) => {
                let changes = self.pending_changes(&values);
                Summary::update(previous.clone(), values, persisted, changes)
            }
            None => Summary::creation(values, persisted),
        };
        summary.with_ctx_options(Arc::clone(&self.ctx_options))
    }

    /// Recorded changes plus every admitted persisted value that still
    /// differs from the stored one, so callbacks running mid-update see
    /// `values == previous ⊕ changes`.
    fn pending_changes(&self, values: &Record) -> Record {
        let depth = self.schema.options.equality_depth;
        let mut changes = self.changes.clone();
        for property in self.admitted() {
            if !property.category.is_persisted() || changes.contains_key(&property.name) {
                continue;
            }
            let Some(value) = values.get(&property.name) else {
                continue;
            };
            let previous = self.previous(&property.name).unwrap_or(&Value::Null);
            if !is_equal(previous, value, depth) {
                changes.insert(property.name.clone(), value.clone());
            }
        }
        changes
    }

    fn persisted_of(&self, values: &Record) -> Record {
        values
            .iter()
            .filter(|(key, _)| {
                self.schema
                    .property(key)
                    .is_none_or(|p| p.category.is_persisted())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
