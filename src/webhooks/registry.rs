//! Registry mapping action types to handlers.
//!
//! The registry is open-ended: supporting a new vendor action type means
//! registering one more handler, and an action type nobody registered is
//! reported as unhandled rather than treated as an error. It is built once at
//! startup and shared read-only behind an `Arc` afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::events::Action;
use crate::effects::{LookupError, SinkError};

/// Errors raised inside a handler.
///
/// These never fail the webhook delivery: the dispatcher acknowledges receipt
/// and hands the error to its reporter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// A field the handler cannot do without is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A vendor lookup failed.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] LookupError),

    /// The business-logic sink rejected the data.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The handler panicked or failed in some other unexpected way.
    #[error("handler internal error: {0}")]
    Internal(String),
}

/// The result of invoking the registry for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// Whether a handler was registered for the action type.
    pub handled: bool,

    /// The handler's error, if it had one.
    pub error: Option<HandlerError>,
}

impl HandlerOutcome {
    /// No handler was registered.
    pub fn unhandled() -> Self {
        HandlerOutcome {
            handled: false,
            error: None,
        }
    }

    /// A handler ran to completion.
    pub fn handled() -> Self {
        HandlerOutcome {
            handled: true,
            error: None,
        }
    }

    /// A handler ran and failed.
    pub fn failed(error: HandlerError) -> Self {
        HandlerOutcome {
            handled: true,
            error: Some(error),
        }
    }
}

/// The future returned by [`ActionHandler::handle`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;

/// Handles one action type.
pub trait ActionHandler: Send + Sync {
    fn handle<'a>(&'a self, action: &'a Action) -> HandlerFuture<'a>;
}

/// Adapts a closure taking an owned [`Action`] into an [`ActionHandler`].
struct FnHandler<F>(F);

impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Action) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle<'a>(&'a self, action: &'a Action) -> HandlerFuture<'a> {
        Box::pin((self.0)(action.clone()))
    }
}

/// Mapping from action-type discriminator to handler.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `action_type`, replacing any earlier one.
    pub fn register(
        &mut self,
        action_type: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) {
        let action_type = action_type.into();
        if self
            .handlers
            .insert(action_type.clone(), Arc::new(handler))
            .is_some()
        {
            warn!(action_type = %action_type, "Replaced existing action handler");
        }
    }

    /// Registers an async closure for `action_type`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reader_webhook::webhooks::HandlerRegistry;
    ///
    /// let mut registry = HandlerRegistry::new();
    /// registry.register_fn("display_cart", |action| async move {
    ///     println!("cart shown on reader: {:?}", action.status);
    ///     Ok::<(), reader_webhook::webhooks::HandlerError>(())
    /// });
    /// assert!(registry.contains("display_cart"));
    /// ```
    pub fn register_fn<F, Fut>(&mut self, action_type: impl Into<String>, f: F)
    where
        F: Fn(Action) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(action_type, FnHandler(f));
    }

    /// Returns true if a handler is registered for `action_type`.
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Registered action types, in no particular order.
    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Invokes the handler registered for `action_type`.
    ///
    /// The handler runs on its own task, so a panic inside it becomes
    /// [`HandlerError::Internal`] instead of tearing down the request.
    pub async fn invoke(&self, action_type: &str, action: &Action) -> HandlerOutcome {
        let Some(handler) = self.handlers.get(action_type) else {
            debug!(action_type = %action_type, "No handler registered; action unhandled");
            return HandlerOutcome::unhandled();
        };

        let handler = Arc::clone(handler);
        let action = action.clone();
        let task = tokio::spawn(async move { handler.handle(&action).await });

        match task.await {
            Ok(Ok(())) => HandlerOutcome::handled(),
            Ok(Err(e)) => HandlerOutcome::failed(e),
            Err(join_error) => {
                HandlerOutcome::failed(HandlerError::Internal(join_error.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.action_types().collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("action_types", &types)
            .finish()
    }
}
