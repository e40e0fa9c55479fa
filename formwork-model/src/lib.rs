//! Declarative object schemas.
//!
//! A [`Schema`] is compiled once from property definitions:
//! - every property is classified into one [`Category`] by the rule table
//! - `dependsOn` edges form an acyclic [dependency graph](Schema::evaluation_order)
//! - aliases map external input keys onto virtual properties
//!
//! Its [`Model`] then runs `create`, `clone`, `update`, `delete` and
//! `validate`. Each call resolves values in dependency order against a fresh
//! context, aggregates failures through an [`ErrorTool`], and returns an
//! [`Outcome`] whose lifecycle handlers run only when the caller asks.
//!
//! ```
//! use formwork_model::{PropertyDefinition, Schema};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let schema = Schema::builder()
//!     .property("id", PropertyDefinition::new().constant().value(1))
//!     .property(
//!         "setQuantity",
//!         PropertyDefinition::new()
//!             .as_virtual()
//!             .alias("qty")
//!             .validator(|value, _| value.is_u64()),
//!     )
//!     .property(
//!         "quantity",
//!         PropertyDefinition::new()
//!             .dependent()
//!             .default(0)
//!             .depends_on(["setQuantity"])
//!             .resolver(|s| s.get("setQuantity").cloned().unwrap_or_default()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let outcome = schema.model().create(json!({ "qty": 12 })).await.unwrap();
//! assert_eq!(outcome.data(), json!({ "id": 1, "quantity": 12 }).as_object());
//! # });
//! ```

mod compiler;
mod context;
mod equality;
mod functions;
mod graph;
mod lifecycle;
mod model;
mod operation;
mod options;
mod property;
mod resolver;
mod rules;
mod schema;
mod strategy;

pub use equality::is_equal;
pub use functions::{
    async_handler_fn, async_resolver_fn, async_validator_fn, handler_fn, resolver_fn,
    validator_fn, Handler, Predicate, Resolver, Validator, ValidatorResponse,
};
pub use lifecycle::Outcome;
pub use model::{CallOptions, CloneOptions, Model, OperationResult};
pub use options::{
    ErrorMode, SchemaOptions, Timestamps, DEFAULT_CREATED_AT, DEFAULT_EQUALITY_DEPTH,
    DEFAULT_UPDATED_AT,
};
pub use property::{Gate, PropertyDefinition, Readonly, Required, Requirement, Setter};
pub use rules::{classify, Category, Keyword};
pub use schema::{Schema, SchemaBuilder};

pub use formwork_types::{
    DefaultErrorTool, ErrorMessage, ErrorPayload, ErrorTool, FieldError, Operation,
    OperationError, Record, SchemaDefinitionError, SchemaResult, Summary,
};
