//! Error types for schema compilation and runtime operations.

use crate::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type for schema construction.
pub type SchemaResult<T> = Result<T, SchemaDefinitionError>;

/// Top-level message attached to every error produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorMessage {
    /// Input to an operation was not a plain object.
    InvalidData,
    /// The schema definition was rejected at construction time.
    InvalidSchema,
    /// An update produced no effective change.
    NothingToUpdate,
    /// One or more fields failed validation.
    ValidationError,
}

impl ErrorMessage {
    /// Returns the wire representation (e.g. `"NOTHING_TO_UPDATE"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidData => "INVALID_DATA",
            Self::InvalidSchema => "INVALID_SCHEMA",
            Self::NothingToUpdate => "NOTHING_TO_UPDATE",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single field failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Record>,
}

impl FieldError {
    /// A failure with a single reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
            metadata: None,
        }
    }

    /// A failure with several reasons. Duplicates are collapsed.
    pub fn with_reasons<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut error = Self::default();
        for reason in reasons {
            error.push_reason(reason.into());
        }
        error
    }

    /// Attaches metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Record) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Merges another failure for the same field into this one.
    ///
    /// Reasons are appended without duplication; metadata objects are
    /// shallow-merged with keys from `other` taking precedence.
    pub fn merge(&mut self, other: FieldError) {
        for reason in other.reasons {
            self.push_reason(reason);
        }
        if let Some(incoming) = other.metadata {
            self.metadata.get_or_insert_with(Record::new).extend(incoming);
        }
    }

    fn push_reason(&mut self, reason: String) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

/// Field key → failure, as carried by runtime errors.
pub type ErrorPayload = BTreeMap<String, FieldError>;

/// The error produced by [`DefaultErrorTool`](crate::DefaultErrorTool).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct OperationError {
    pub message: ErrorMessage,
    pub payload: ErrorPayload,
}

impl OperationError {
    /// An error with an empty payload.
    pub fn new(message: ErrorMessage) -> Self {
        Self {
            message,
            payload: ErrorPayload::new(),
        }
    }

    /// Returns the failure recorded for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.payload.get(field)
    }

    /// Returns the reasons recorded for `field` (empty if none).
    pub fn reasons(&self, field: &str) -> &[String] {
        self.payload
            .get(field)
            .map(|e| e.reasons.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_invalid_data(&self) -> bool {
        self.message == ErrorMessage::InvalidData
    }

    pub fn is_nothing_to_update(&self) -> bool {
        self.message == ErrorMessage::NothingToUpdate
    }

    pub fn is_validation_error(&self) -> bool {
        self.message == ErrorMessage::ValidationError
    }
}

/// A schema definition was rejected.
///
/// Always fatal: returned from schema construction regardless of the
/// schema's `errors` option. The payload maps each offending property (or
/// option name) to every message recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {} field(s) rejected", ErrorMessage::InvalidSchema, .payload.len())]
pub struct SchemaDefinitionError {
    pub payload: BTreeMap<String, Vec<String>>,
}

impl SchemaDefinitionError {
    /// Returns the messages recorded for `field` (empty if none).
    pub fn reasons(&self, field: &str) -> &[String] {
        self.payload.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if `field` has a message containing `needle`.
    pub fn mentions(&self, field: &str, needle: &str) -> bool {
        self.reasons(field).iter().any(|m| m.contains(needle))
    }
}
