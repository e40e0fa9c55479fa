//! The entity operations: create, clone, update, delete and validate.

use crate::compiler::CompiledSchema;
use crate::context::OperationContext;
use crate::lifecycle::{DeleteDispatch, Outcome};
use crate::operation::{self, Resolved};
use crate::options::ErrorMode;
use crate::resolver::{self, Verdict};
use formwork_types::{DefaultErrorTool, ErrorMessage, ErrorTool, FieldError, Record};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Result of create, clone and update.
///
/// Under [`ErrorMode::Silent`] failures are `Ok` with `error` set; under
/// [`ErrorMode::Throw`] they are `Err`.
pub type OperationResult<T> = Result<Outcome<<T as ErrorTool>::Error>, <T as ErrorTool>::Error>;

const INVALID_PROPERTY: &str = "Invalid property";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Exposed to every callback as [`Summary::ctx_options`](formwork_types::Summary::ctx_options).
    pub ctx_options: Record,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ctx_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ctx_options.insert(key.into(), value.into());
        self
    }
}

/// Options for [`Model::clone_with`].
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Properties reset to their default instead of copied.
    pub reset: Vec<String>,
    pub ctx_options: Record,
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reset.extend(properties.into_iter().map(Into::into));
        self
    }

    pub fn ctx_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ctx_options.insert(key.into(), value.into());
        self
    }
}

/// Runs operations against a compiled schema. Cheap to clone.
pub struct Model<T: ErrorTool = DefaultErrorTool> {
    schema: Arc<CompiledSchema>,
    _tool: PhantomData<fn() -> T>,
}

impl<T: ErrorTool> Model<T> {
    pub(crate) fn new(schema: Arc<CompiledSchema>) -> Self {
        Self {
            schema,
            _tool: PhantomData,
        }
    }

    /// Creates an entity from `input`. `Value::Null` is treated as `{}`.
    pub async fn create(&self, input: Value) -> OperationResult<T> {
        self.create_with(input, CallOptions::default()).await
    }

    pub async fn create_with(&self, input: Value, options: CallOptions) -> OperationResult<T> {
        let resolved = operation::create(&self.schema, input, Arc::new(options.ctx_options)).await;
        self.settle(resolved).await
    }

    /// Creates a copy of `entity`, recomputing constants and dependents.
    pub async fn clone_entity(&self, entity: Value) -> OperationResult<T> {
        self.clone_with(entity, CloneOptions::default()).await
    }

    pub async fn clone_with(&self, entity: Value, options: CloneOptions) -> OperationResult<T> {
        let resolved = operation::clone(
            &self.schema,
            entity,
            &options.reset,
            Arc::new(options.ctx_options),
        )
        .await;
        self.settle(resolved).await
    }

    /// Applies `changes` to `previous`. On success `data` holds only the
    /// effective changes.
    pub async fn update(&self, previous: Value, changes: Value) -> OperationResult<T> {
        self.update_with(previous, changes, CallOptions::default()).await
    }

    pub async fn update_with(
        &self,
        previous: Value,
        changes: Value,
        options: CallOptions,
    ) -> OperationResult<T> {
        let resolved = operation::update(
            &self.schema,
            previous,
            changes,
            Arc::new(options.ctx_options),
        )
        .await;
        self.settle(resolved).await
    }

    /// Runs the `onDelete` handlers of every persisted property present in
    /// `entity`, then the schema's. Handler failures are contained.
    pub async fn delete(&self, entity: Value) -> Result<(), T::Error> {
        let Value::Object(entity) = entity else {
            return Err(T::new(ErrorMessage::InvalidData).error());
        };

        let mut dispatch = DeleteDispatch::new(entity);
        for property in &self.schema.properties {
            if property.category.is_persisted() && dispatch.input().contains_key(&property.name) {
                dispatch.extend(&property.name, &property.definition.on_delete);
            }
        }
        dispatch.extend_global(&self.schema.options.on_delete);

        let failures = dispatch.run().await;
        debug!(handlers = dispatch.len(), failures, "Entity deleted");
        Ok(())
    }

    /// Sanitizes and validates a single value as it would be at creation.
    ///
    /// `key` may be a property name or an alias. `overrides` seeds the
    /// sibling values the callbacks see.
    pub async fn validate(
        &self,
        key: &str,
        value: Value,
        overrides: Record,
    ) -> Result<Value, FieldError> {
        let Some(property) = self
            .schema
            .lookup_input(key)
            .filter(|p| p.category.accepts_input())
        else {
            return Err(FieldError::new(INVALID_PROPERTY));
        };

        let mut ctx = OperationContext::creation(&self.schema, Arc::default());
        for (name, value) in overrides {
            ctx.set(&name, value);
        }

        match resolver::evaluate(property, value, &ctx).await {
            Verdict::Valid(value) => Ok(value),
            Verdict::Invalid { error, .. } => Err(error),
        }
    }

    async fn settle(&self, resolved: Resolved<T>) -> OperationResult<T> {
        match resolved {
            Resolved::Success { data, handlers } => Ok(Outcome::success(data, handlers)),
            Resolved::Failure { tool, handlers } => {
                let error = tool.error();
                match self.schema.options.errors {
                    ErrorMode::Silent => Ok(Outcome::failure(error, handlers)),
                    ErrorMode::Throw => {
                        if let Some(handlers) = handlers {
                            handlers.run().await;
                        }
                        Err(error)
                    }
                }
            }
        }
    }
}

impl<T: ErrorTool> Clone for Model<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.schema))
    }
}

impl<T: ErrorTool> fmt::Debug for Model<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("properties", &self.schema.properties.len())
            .finish_non_exhaustive()
    }
}
