//! Core type definitions for Formwork.
//!
//! This crate defines the engine-agnostic types shared by the schema compiler
//! and the operation engine:
//! - [`Record`] — the plain key/value object every input, entity and change set uses
//! - [`Summary`] — the read-only snapshot handed to callbacks and lifecycle handlers
//! - [`FieldError`] / [`ErrorPayload`] — per-field failure reasons and metadata
//! - [`ErrorTool`] — the pluggable aggregator that turns field failures into an error
//! - [`SchemaDefinitionError`] — the compile-time schema error
//!
//! Nothing here knows about property categories or dependency graphs; those
//! live in `formwork-model`.

mod error;
mod error_tool;
mod summary;

pub use error::{
    ErrorMessage, ErrorPayload, FieldError, OperationError, SchemaDefinitionError, SchemaResult,
};
pub use error_tool::{DefaultErrorTool, ErrorTool};
pub use summary::{Operation, Summary};

/// A plain JSON object: the shape of inputs, entities and change sets.
pub type Record = serde_json::Map<String, serde_json::Value>;
