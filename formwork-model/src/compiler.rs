//! Schema definition validator.
//!
//! Consumes raw definitions and options, classifies every property through
//! the rule table, builds the dependency graph and checks the options. Every
//! problem from every property is aggregated before anything is returned.

use crate::graph::DependencyGraph;
use crate::options::{self, SchemaOptions};
use crate::property::PropertyDefinition;
use crate::rules::{self, Category};
use crate::strategy::Strategy;
use formwork_types::{SchemaDefinitionError, SchemaResult};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Accumulates `field → messages` while a schema compiles.
#[derive(Debug, Default)]
pub(crate) struct DefinitionErrors {
    payload: BTreeMap<String, Vec<String>>,
}

impl DefinitionErrors {
    pub(crate) fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let messages = self.payload.entry(field.into()).or_default();
        let message = message.into();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub(crate) fn finish<T>(self, value: T) -> SchemaResult<T> {
        if self.payload.is_empty() {
            Ok(value)
        } else {
            Err(SchemaDefinitionError {
                payload: self.payload,
            })
        }
    }
}

/// A classified property.
#[derive(Debug)]
pub(crate) struct CompiledProperty {
    pub(crate) name: String,
    pub(crate) category: Category,
    pub(crate) strategy: Strategy,
    pub(crate) definition: PropertyDefinition,
}

/// The immutable result of compilation, shared by every operation.
#[derive(Debug)]
pub(crate) struct CompiledSchema {
    /// Declaration order.
    pub(crate) properties: Vec<CompiledProperty>,
    index: HashMap<String, usize>,
    pub(crate) graph: DependencyGraph,
    pub(crate) options: SchemaOptions,
}

impl CompiledSchema {
    pub(crate) fn property(&self, name: &str) -> Option<&CompiledProperty> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    /// Maps a caller-supplied key to its property. Alias keys resolve to their
    /// virtual before plain names, because the only property allowed to share
    /// an alias's name is a dependent, which never accepts input.
    pub(crate) fn lookup_input(&self, key: &str) -> Option<&CompiledProperty> {
        match self.graph.virtual_for_alias(key) {
            Some(name) => self.property(name),
            None => self.property(key),
        }
    }

    /// Whether `key` may carry an error reason: an input-accepting property
    /// or an alias.
    pub(crate) fn is_error_key(&self, key: &str) -> bool {
        self.lookup_input(key)
            .is_some_and(|p| p.category.accepts_input())
    }

    pub(crate) fn is_timestamp_key(&self, key: &str) -> bool {
        self.options.timestamps.keys().any(|k| k == key)
    }
}

pub(crate) fn compile(
    definitions: Vec<(String, PropertyDefinition)>,
    options: SchemaOptions,
) -> SchemaResult<CompiledSchema> {
    let mut errors = DefinitionErrors::default();

    if definitions.is_empty() {
        errors.add("schema", "A schema must declare at least one property");
    }

    let mut properties: Vec<CompiledProperty> = Vec::with_capacity(definitions.len());
    let mut index = HashMap::with_capacity(definitions.len());

    for (name, definition) in definitions {
        if name.trim().is_empty() {
            errors.add("schema", "Property names cannot be empty");
            continue;
        }
        if index.contains_key(&name) {
            errors.add(&name, "Property is declared more than once");
            continue;
        }

        let category = rules::classify(&definition);
        for message in rules::check(&definition, category) {
            errors.add(&name, message);
        }

        index.insert(name.clone(), properties.len());
        properties.push(CompiledProperty {
            name,
            category,
            strategy: Strategy::of(category, &definition),
            definition,
        });
    }

    let graph = DependencyGraph::build(&properties, &mut errors);
    options::check(&options, |name| index.contains_key(name), &mut errors);

    if !errors.is_empty() {
        debug!(
            properties = properties.len(),
            "Schema rejected at compile time"
        );
    }

    let schema = errors.finish(CompiledSchema {
        properties,
        index,
        graph,
        options,
    })?;

    debug!(
        properties = schema.properties.len(),
        dependents = schema.graph.evaluation_order().len(),
        "Schema compiled"
    );
    Ok(schema)
}
