//! Raw property definitions.
//!
//! A [`PropertyDefinition`] only records which keywords a property declares.
//! Nothing is checked while building one: illegal combinations are collected
//! and reported together when the schema compiles (see [`crate::rules`]).

use crate::functions::{
    async_handler_fn, async_resolver_fn, async_validator_fn, handler_fn, resolver_fn,
    validator_fn, Handler, Predicate, Resolver, Validator, ValidatorResponse,
};
use crate::rules::Keyword;
use formwork_types::{Record, Summary};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Readonly flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readonly {
    /// `readonly: true`: immutable once set at creation.
    Strict,
    /// `readonly: "lax"`: optional at creation, immutable once set to a
    /// non-default value.
    Lax,
}

/// A `shouldInit` / `shouldUpdate` gate: a literal or a predicate.
#[derive(Clone)]
pub enum Gate {
    Bool(bool),
    When(Predicate),
}

impl Gate {
    pub(crate) fn allows(&self, summary: &Summary) -> bool {
        match self {
            Self::Bool(allowed) => *allowed,
            Self::When(predicate) => predicate(summary),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "Gate({b})"),
            Self::When(_) => f.write_str("Gate(<predicate>)"),
        }
    }
}

/// Result of a conditional `required` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub required: bool,
    pub message: Option<String>,
}

impl From<bool> for Requirement {
    fn from(required: bool) -> Self {
        Self {
            required,
            message: None,
        }
    }
}

impl From<(bool, &str)> for Requirement {
    fn from((required, message): (bool, &str)) -> Self {
        Self {
            required,
            message: Some(message.to_string()),
        }
    }
}

impl From<(bool, String)> for Requirement {
    fn from((required, message): (bool, String)) -> Self {
        Self {
            required,
            message: Some(message),
        }
    }
}

/// The `required` keyword.
#[derive(Clone)]
pub enum Required {
    Bool(bool),
    When(Arc<dyn Fn(&Summary) -> Requirement + Send + Sync>),
}

impl fmt::Debug for Required {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "Required({b})"),
            Self::When(_) => f.write_str("Required(<predicate>)"),
        }
    }
}

/// A `default` or constant `value`: a literal or a computed value.
#[derive(Clone)]
pub enum Setter {
    Static(Value),
    Computed(Arc<dyn Resolver>),
}

impl Setter {
    pub(crate) async fn evaluate(&self, summary: &Summary) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Computed(resolver) => resolver.resolve(summary).await,
        }
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(v) => write!(f, "Static({v})"),
            Self::Computed(_) => f.write_str("Computed(<resolver>)"),
        }
    }
}

/// The declared keywords of a single property.
///
/// ```
/// use formwork_model::{PropertyDefinition, ValidatorResponse};
///
/// let name = PropertyDefinition::new()
///     .required(true)
///     .validator(|value, _| value.as_str().is_some_and(|s| !s.is_empty()));
///
/// let quantity = PropertyDefinition::new()
///     .dependent()
///     .default(0)
///     .depends_on(["setQuantity"])
///     .resolver(|s| s.get("setQuantity").cloned().unwrap_or_default());
/// # let _ = (name, quantity, ValidatorResponse::valid());
/// ```
#[derive(Clone, Default)]
pub struct PropertyDefinition {
    pub(crate) alias: Option<String>,
    pub(crate) constant: bool,
    pub(crate) default: Option<Setter>,
    pub(crate) dependent: bool,
    pub(crate) depends_on: Option<Vec<String>>,
    pub(crate) is_virtual: bool,
    pub(crate) readonly: Option<Readonly>,
    pub(crate) required: Option<Required>,
    pub(crate) resolver: Option<Arc<dyn Resolver>>,
    pub(crate) sanitizer: Option<Arc<dyn Resolver>>,
    pub(crate) should_init: Option<Gate>,
    pub(crate) should_update: Option<Gate>,
    pub(crate) validator: Option<Arc<dyn Validator>>,
    pub(crate) value: Option<Setter>,
    pub(crate) on_delete: Vec<Arc<dyn Handler<Record>>>,
    pub(crate) on_failure: Vec<Arc<dyn Handler<Summary>>>,
    pub(crate) on_success: Vec<Arc<dyn Handler<Summary>>>,
}

impl PropertyDefinition {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Keywords this definition declares, in canonical order.
    pub fn keywords(&self) -> Vec<Keyword> {
        let present = [
            (Keyword::Alias, self.alias.is_some()),
            (Keyword::Constant, self.constant),
            (Keyword::Default, self.default.is_some()),
            (Keyword::Dependent, self.dependent),
            (Keyword::DependsOn, self.depends_on.is_some()),
            (Keyword::OnDelete, !self.on_delete.is_empty()),
            (Keyword::OnFailure, !self.on_failure.is_empty()),
            (Keyword::OnSuccess, !self.on_success.is_empty()),
            (Keyword::Readonly, self.readonly.is_some()),
            (Keyword::Required, self.required.is_some()),
            (Keyword::Resolver, self.resolver.is_some()),
            (Keyword::Sanitizer, self.sanitizer.is_some()),
            (Keyword::ShouldInit, self.should_init.is_some()),
            (Keyword::ShouldUpdate, self.should_update.is_some()),
            (Keyword::Validator, self.validator.is_some()),
            (Keyword::Value, self.value.is_some()),
            (Keyword::Virtual, self.is_virtual),
        ];
        present
            .into_iter()
            .filter_map(|(keyword, set)| set.then_some(keyword))
            .collect()
    }

    // ── Category markers ─────────────────────────────────────────

    /// `constant: true`. Pair with [`value`](Self::value).
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// `dependent: true`. Pair with `default`, `depends_on` and `resolver`.
    pub fn dependent(mut self) -> Self {
        self.dependent = true;
        self
    }

    /// `virtual: true`.
    pub fn as_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// `readonly: true`.
    pub fn readonly(mut self) -> Self {
        self.readonly = Some(Readonly::Strict);
        self
    }

    /// `readonly: 'lax'`.
    pub fn readonly_lax(mut self) -> Self {
        self.readonly = Some(Readonly::Lax);
        self
    }

    // ── Values ───────────────────────────────────────────────────

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(Setter::Static(value.into()));
        self
    }

    /// Default computed from the partially built context.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> Value + Send + Sync + 'static,
    {
        self.default = Some(Setter::Computed(resolver_fn(f)));
        self
    }

    /// Constant value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(Setter::Static(value.into()));
        self
    }

    /// Constant value computed at creation.
    pub fn value_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> Value + Send + Sync + 'static,
    {
        self.value = Some(Setter::Computed(resolver_fn(f)));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn depends_on<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    // ── Callbacks ────────────────────────────────────────────────

    pub fn resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> Value + Send + Sync + 'static,
    {
        self.resolver = Some(resolver_fn(f));
        self
    }

    pub fn async_resolver<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Summary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        self.resolver = Some(async_resolver_fn(f));
        self
    }

    pub fn resolver_with(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sanitizer run before the validator. Reads the raw value from the
    /// summary context under the property's own name.
    pub fn sanitizer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> Value + Send + Sync + 'static,
    {
        self.sanitizer = Some(resolver_fn(f));
        self
    }

    pub fn async_sanitizer<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Summary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        self.sanitizer = Some(async_resolver_fn(f));
        self
    }

    pub fn validator<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Summary) -> R + Send + Sync + 'static,
        R: Into<ValidatorResponse> + 'static,
    {
        self.validator = Some(validator_fn(f));
        self
    }

    pub fn async_validator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Summary) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ValidatorResponse> + Send + 'static,
    {
        self.validator = Some(async_validator_fn(f));
        self
    }

    pub fn validator_with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    // ── Gates ────────────────────────────────────────────────────

    /// `required: true` (or the illegal `false`).
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(Required::Bool(required));
        self
    }

    /// Conditional requirement. Return a `bool` or `(bool, message)`.
    pub fn required_when<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> R + Send + Sync + 'static,
        R: Into<Requirement> + 'static,
    {
        self.required = Some(Required::When(Arc::new(move |s: &Summary| -> Requirement {
            f(s).into()
        })));
        self
    }

    pub fn should_init(mut self, allowed: bool) -> Self {
        self.should_init = Some(Gate::Bool(allowed));
        self
    }

    pub fn should_init_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> bool + Send + Sync + 'static,
    {
        self.should_init = Some(Gate::When(Arc::new(f)));
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

    // ── Lifecycle ────────────────────────────────────────────────

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

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&Summary) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_failure.push(handler_fn(f));
        self
    }

    pub fn on_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_delete.push(handler_fn(f));
        self
    }

    pub fn on_delete_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_delete.push(async_handler_fn(f));
        self
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords: Vec<&str> = self.keywords().into_iter().map(Keyword::name).collect();
        f.debug_struct("PropertyDefinition")
            .field("keywords", &keywords)
            .field("alias", &self.alias)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}
