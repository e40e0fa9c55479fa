//! Lifecycle dispatcher.
//!
//! Handlers are collected while an operation resolves and run afterwards,
//! sequentially and in order: per-property handlers in declaration order,
//! then schema-level ones. Each handler sees the same frozen input. A handler
//! that returns an error or panics is logged and skipped; the rest still run.

use crate::functions::Handler;
use formwork_types::{Record, Summary};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owner recorded for schema-level handlers.
const SCHEMA_OWNER: &str = "<schema>";

/// An ordered batch of handlers bound to one input.
pub(crate) struct Dispatch<I: Sync + 'static> {
    input: I,
    handlers: Vec<(String, Arc<dyn Handler<I>>)>,
}

impl<I: Sync + 'static> Dispatch<I> {
    pub(crate) fn new(input: I) -> Self {
        Self {
            input,
            handlers: Vec::new(),
        }
    }

    pub(crate) fn extend<'h>(
        &mut self,
        owner: &str,
        handlers: impl IntoIterator<Item = &'h Arc<dyn Handler<I>>>,
    ) {
        self.handlers.extend(
            handlers
                .into_iter()
                .map(|handler| (owner.to_string(), Arc::clone(handler))),
        );
    }

    pub(crate) fn extend_global<'h>(
        &mut self,
        handlers: impl IntoIterator<Item = &'h Arc<dyn Handler<I>>>,
    ) {
        self.extend(SCHEMA_OWNER, handlers);
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn input(&self) -> &I {
        &self.input
    }

    /// Runs every handler. Returns how many failed.
    pub(crate) async fn run(&self) -> usize {
        let mut failures = 0;
        for (owner, handler) in &self.handlers {
            if !run_contained(owner, handler.as_ref(), &self.input).await {
                failures += 1;
            }
        }
        if !self.handlers.is_empty() {
            debug!(handlers = self.handlers.len(), failures, "Lifecycle handlers dispatched");
        }
        failures
    }
}

async fn run_contained<I: Sync + ?Sized>(owner: &str, handler: &dyn Handler<I>, input: &I) -> bool {
    match AssertUnwindSafe(handler.handle(input)).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(owner = %owner, error = %e, "Lifecycle handler failed");
            false
        }
        Err(_) => {
            warn!(owner = %owner, "Lifecycle handler panicked");
            false
        }
    }
}

pub(crate) type SummaryDispatch = Dispatch<Summary>;
pub(crate) type DeleteDispatch = Dispatch<Record>;

/// The result of a create, clone or update.
///
/// Holds either the output record or the error. Handlers registered for the
/// outcome (`onSuccess` on success, `onFailure` on a silent failure) are not
/// run until [`run_handlers`](Self::run_handlers) is awaited, so handler
/// latency never delays the result.
pub struct Outcome<E> {
    result: Result<Record, E>,
    handlers: Option<SummaryDispatch>,
}

impl<E> Outcome<E> {
    pub(crate) fn success(data: Record, handlers: SummaryDispatch) -> Self {
        Self {
            result: Ok(data),
            handlers: Some(handlers),
        }
    }

    pub(crate) fn failure(error: E, handlers: Option<SummaryDispatch>) -> Self {
        Self {
            result: Err(error),
            handlers,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The created record, or the change set of an update.
    pub fn data(&self) -> Option<&Record> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&E> {
        self.result.as_ref().err()
    }

    pub fn into_data(self) -> Option<Record> {
        self.result.ok()
    }

    pub fn into_error(self) -> Option<E> {
        self.result.err()
    }

    /// The summary the handlers will receive.
    pub fn summary(&self) -> Option<&Summary> {
        self.handlers.as_ref().map(Dispatch::input)
    }

    /// Number of handlers waiting to run.
    pub fn pending_handlers(&self) -> usize {
        self.handlers.as_ref().map_or(0, Dispatch::len)
    }

    /// Runs the deferred handlers. Failing handlers are logged and do not
    /// stop the others. Running twice runs them twice.
    pub async fn run_handlers(&self) {
        if let Some(handlers) = &self.handlers {
            handlers.run().await;
        }
    }

    /// Drops the deferred handlers and converts into a `Result`.
    pub fn into_result(self) -> Result<Record, E> {
        self.result
    }
}

impl<E: fmt::Debug> fmt::Debug for Outcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("result", &self.result)
            .field("pending_handlers", &self.pending_handlers())
            .finish()
    }
}
