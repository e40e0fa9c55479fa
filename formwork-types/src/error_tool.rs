//! The pluggable error aggregator.

use crate::{ErrorMessage, ErrorPayload, FieldError, OperationError};

/// Collects per-field failures during an operation and finalizes them into
/// an error value.
///
/// The engine only relies on `add`, `fields`, `is_loaded` and `error`, so a
/// consumer can swap in a different error representation by implementing
/// this trait and passing it as the schema's error tool type parameter.
pub trait ErrorTool: Sized + Send + 'static {
    /// The finalized error surfaced to callers.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates an empty aggregator for the given top-level message.
    fn new(message: ErrorMessage) -> Self;

    /// Records a failure for `field`. Repeated calls for the same field must
    /// merge rather than overwrite.
    fn add(&mut self, field: &str, value: FieldError);

    /// Returns the field keys recorded so far.
    fn fields(&self) -> Vec<String>;

    /// Returns true once at least one field has been recorded.
    fn is_loaded(&self) -> bool {
        !self.fields().is_empty()
    }

    /// Finalizes the aggregator into the error surfaced to callers.
    fn error(self) -> Self::Error;
}

/// Default aggregator producing an [`OperationError`].
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultErrorTool {
    message: ErrorMessage,
    payload: ErrorPayload,
}

impl DefaultErrorTool {
    /// Returns the payload collected so far.
    pub fn data(&self) -> &ErrorPayload {
        &self.payload
    }

    /// Returns the current top-level message.
    pub fn message(&self) -> ErrorMessage {
        self.message
    }

    /// Replaces the top-level message.
    pub fn set_message(&mut self, message: ErrorMessage) {
        self.message = message;
    }
}

impl ErrorTool for DefaultErrorTool {
    type Error = OperationError;

    fn new(message: ErrorMessage) -> Self {
        Self {
            message,
            payload: ErrorPayload::new(),
        }
    }

    fn add(&mut self, field: &str, value: FieldError) {
        match self.payload.get_mut(field) {
            Some(existing) => existing.merge(value),
            None => {
                self.payload.insert(field.to_string(), value);
            }
        }
    }

    fn fields(&self) -> Vec<String> {
        self.payload.keys().cloned().collect()
    }

    fn is_loaded(&self) -> bool {
        !self.payload.is_empty()
    }

    fn error(self) -> OperationError {
        OperationError {
            message: self.message,
            payload: self.payload,
        }
    }
}
