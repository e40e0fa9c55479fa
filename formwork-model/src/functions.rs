//! User-supplied callbacks: validators, resolvers and lifecycle handlers.
//!
//! Every callback is an `async_trait` trait so that it may await I/O. Plain
//! closures are adapted through the `*_fn` wrappers below; closures that
//! return futures receive owned copies of their arguments.

use async_trait::async_trait;
use formwork_types::{Record, Summary};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// A synchronous gate over the operation snapshot.
pub type Predicate = Arc<dyn Fn(&Summary) -> bool + Send + Sync>;

/// Checks a single value. The summary carries every sibling value.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, value: &Value, summary: &Summary) -> ValidatorResponse;
}

/// Produces a value from the operation snapshot.
///
/// Used for dependent resolvers, sanitizers, and computed defaults/constants.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, summary: &Summary) -> Value;
}

/// A lifecycle handler. `I` is a [`Summary`] for success/failure handlers
/// and the deleted entity [`Record`] for delete handlers.
///
/// Errors (and panics) are contained by the dispatcher.
#[async_trait]
pub trait Handler<I: Sync + ?Sized>: Send + Sync {
    async fn handle(&self, input: &I) -> anyhow::Result<()>;
}

/// Outcome of a validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorResponse {
    /// Accepted. `validated` replaces the input value when present.
    Valid { validated: Option<Value> },
    /// Rejected.
    Invalid {
        reasons: Vec<String>,
        metadata: Option<Record>,
        /// Extra reasons attached to sibling fields (property names or aliases).
        other_reasons: BTreeMap<String, Vec<String>>,
    },
}

impl ValidatorResponse {
    pub fn valid() -> Self {
        Self::Valid { validated: None }
    }

    /// Accepted, replacing the input with `value`.
    pub fn validated(value: impl Into<Value>) -> Self {
        Self::Valid {
            validated: Some(value.into()),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reasons: vec![reason.into()],
            metadata: None,
            other_reasons: BTreeMap::new(),
        }
    }

    pub fn invalid_with<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Invalid {
            reasons: reasons.into_iter().map(Into::into).collect(),
            metadata: None,
            other_reasons: BTreeMap::new(),
        }
    }

    /// Attaches metadata to a rejection. No-op on acceptance.
    #[must_use]
    pub fn with_metadata(mut self, value: Record) -> Self {
        if let Self::Invalid { metadata, .. } = &mut self {
            *metadata = Some(value);
        }
        self
    }

    /// Attaches a reason to a sibling field. No-op on acceptance.
    #[must_use]
    pub fn with_other_reason(mut self, field: impl Into<String>, reason: impl Into<String>) -> Self {
        if let Self::Invalid { other_reasons, .. } = &mut self {
            other_reasons
                .entry(field.into())
                .or_default()
                .push(reason.into());
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

impl From<bool> for ValidatorResponse {
    fn from(valid: bool) -> Self {
        if valid {
            Self::valid()
        } else {
            Self::invalid_with(Vec::<String>::new())
        }
    }
}

// ── Closure adapters ─────────────────────────────────────────────

struct ValidatorFn<F>(F);
struct AsyncValidatorFn<F>(F);
struct ResolverFn<F>(F);
struct AsyncResolverFn<F>(F);
struct HandlerFn<F>(F);
struct AsyncHandlerFn<F>(F);

#[async_trait]
impl<F, R> Validator for ValidatorFn<F>
where
    F: Fn(&Value, &Summary) -> R + Send + Sync,
    R: Into<ValidatorResponse> + 'static,
{
    async fn validate(&self, value: &Value, summary: &Summary) -> ValidatorResponse {
        (self.0)(value, summary).into()
    }
}

#[async_trait]
impl<F, Fut> Validator for AsyncValidatorFn<F>
where
    F: Fn(Value, Summary) -> Fut + Send + Sync,
    Fut: Future<Output = ValidatorResponse> + Send + 'static,
{
    async fn validate(&self, value: &Value, summary: &Summary) -> ValidatorResponse {
        (self.0)(value.clone(), summary.clone()).await
    }
}

#[async_trait]
impl<F> Resolver for ResolverFn<F>
where
    F: Fn(&Summary) -> Value + Send + Sync,
{
    async fn resolve(&self, summary: &Summary) -> Value {
        (self.0)(summary)
    }
}

#[async_trait]
impl<F, Fut> Resolver for AsyncResolverFn<F>
where
    F: Fn(Summary) -> Fut + Send + Sync,
    Fut: Future<Output = Value> + Send + 'static,
{
    async fn resolve(&self, summary: &Summary) -> Value {
        (self.0)(summary.clone()).await
    }
}

#[async_trait]
impl<I, F> Handler<I> for HandlerFn<F>
where
    I: Sync + ?Sized,
    F: Fn(&I) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, input: &I) -> anyhow::Result<()> {
        (self.0)(input)
    }
}

#[async_trait]
impl<I, F, Fut> Handler<I> for AsyncHandlerFn<F>
where
    I: Sync + Clone,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, input: &I) -> anyhow::Result<()> {
        (self.0)(input.clone()).await
    }
}

/// Wraps a synchronous validator closure.
pub fn validator_fn<F, R>(f: F) -> Arc<dyn Validator>
where
    F: Fn(&Value, &Summary) -> R + Send + Sync + 'static,
    R: Into<ValidatorResponse> + 'static,
{
    Arc::new(ValidatorFn(f))
}

/// Wraps a validator closure returning a future.
pub fn async_validator_fn<F, Fut>(f: F) -> Arc<dyn Validator>
where
    F: Fn(Value, Summary) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ValidatorResponse> + Send + 'static,
{
    Arc::new(AsyncValidatorFn(f))
}

/// Wraps a synchronous resolver closure.
pub fn resolver_fn<F>(f: F) -> Arc<dyn Resolver>
where
    F: Fn(&Summary) -> Value + Send + Sync + 'static,
{
    Arc::new(ResolverFn(f))
}

/// Wraps a resolver closure returning a future.
pub fn async_resolver_fn<F, Fut>(f: F) -> Arc<dyn Resolver>
where
    F: Fn(Summary) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Value> + Send + 'static,
{
    Arc::new(AsyncResolverFn(f))
}

/// Wraps a synchronous handler closure.
pub fn handler_fn<I, F>(f: F) -> Arc<dyn Handler<I>>
where
    I: Sync + ?Sized + 'static,
    F: Fn(&I) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(HandlerFn(f))
}

/// Wraps a handler closure returning a future.
pub fn async_handler_fn<I, F, Fut>(f: F) -> Arc<dyn Handler<I>>
where
    I: Sync + Send + Clone + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(AsyncHandlerFn(f))
}
