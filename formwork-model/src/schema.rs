//! Compiled schemas.

use crate::compiler::{self, CompiledSchema};
use crate::model::Model;
use crate::options::SchemaOptions;
use crate::property::PropertyDefinition;
use crate::rules::Category;
use formwork_types::{DefaultErrorTool, ErrorTool, SchemaResult};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An immutable, validated schema.
///
/// Building one checks every definition against the rule table and the
/// dependency graph and fails with every problem at once. Once built it is
/// never mutated and can be shared freely; each [`Model`] handed out reads
/// the same compiled data.
///
/// `T` is the error aggregator used by operations.
pub struct Schema<T: ErrorTool = DefaultErrorTool> {
    compiled: Arc<CompiledSchema>,
    _tool: PhantomData<fn() -> T>,
}

impl Schema<DefaultErrorTool> {
    pub fn builder() -> SchemaBuilder<DefaultErrorTool> {
        SchemaBuilder::new()
    }
}

impl<T: ErrorTool> Schema<T> {
    /// Compiles `definitions` (in declaration order) with `options`.
    pub fn new<I, S>(definitions: I, options: SchemaOptions) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (S, PropertyDefinition)>,
        S: Into<String>,
    {
        let definitions = definitions
            .into_iter()
            .map(|(name, definition)| (name.into(), definition))
            .collect();
        let compiled = compiler::compile(definitions, options)?;
        Ok(Self {
            compiled: Arc::new(compiled),
            _tool: PhantomData,
        })
    }

    /// A handle exposing the entity operations.
    pub fn model(&self) -> Model<T> {
        Model::new(Arc::clone(&self.compiled))
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.compiled.options
    }

    /// Property names in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.compiled.properties.iter().map(|p| p.name.as_str())
    }

    pub fn category(&self, name: &str) -> Option<Category> {
        self.compiled.property(name).map(|p| p.category)
    }

    /// Dependents in the order they are resolved.
    pub fn evaluation_order(&self) -> &[String] {
        self.compiled.graph.evaluation_order()
    }

    /// The immediate sources a dependent reads.
    pub fn sources_of(&self, name: &str) -> &[String] {
        self.compiled.graph.sources_of(name)
    }

    /// The dependents reading `name` directly.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.compiled.graph.dependents_of(name)
    }

    pub fn alias_of(&self, virtual_name: &str) -> Option<&str> {
        self.compiled.graph.alias_of(virtual_name)
    }
}

impl<T: ErrorTool> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            compiled: Arc::clone(&self.compiled),
            _tool: PhantomData,
        }
    }
}

impl<T: ErrorTool> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("properties", &self.property_names().collect::<Vec<_>>())
            .field("evaluation_order", &self.evaluation_order())
            .field("options", self.options())
            .finish()
    }
}

/// Collects definitions and options for a [`Schema`].
pub struct SchemaBuilder<T: ErrorTool = DefaultErrorTool> {
    definitions: Vec<(String, PropertyDefinition)>,
    options: SchemaOptions,
    _tool: PhantomData<fn() -> T>,
}

impl<T: ErrorTool> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            options: SchemaOptions::default(),
            _tool: PhantomData,
        }
    }

    /// Declares a property. Declaration order is preserved.
    pub fn property(mut self, name: impl Into<String>, definition: PropertyDefinition) -> Self {
        self.definitions.push((name.into(), definition));
        self
    }

    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Switches the error aggregator.
    pub fn error_tool<U: ErrorTool>(self) -> SchemaBuilder<U> {
        SchemaBuilder {
            definitions: self.definitions,
            options: self.options,
            _tool: PhantomData,
        }
    }

    pub fn build(self) -> SchemaResult<Schema<T>> {
        Schema::new(self.definitions, self.options)
    }
}

impl<T: ErrorTool> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
