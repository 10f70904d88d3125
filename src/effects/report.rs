//! Reporting channel for dispatch results the sender never sees.
//!
//! The vendor only learns whether a delivery was accepted. Failed reader
//! actions, unhandled action types and handler errors are acknowledged with
//! 200 anyway, so they surface here instead. What to do with them (print,
//! alert, count) is the embedding application's choice.

use tracing::{debug, error, info, warn};

use crate::webhooks::{Action, DispatchError, Event, HandlerError};

/// Receives dispatch results that don't affect the HTTP response.
pub trait DispatchReporter: Send + Sync {
    /// The delivery was rejected with 400.
    fn rejected(&self, error: &DispatchError);

    /// The event type is not one that carries reader actions; nothing ran.
    fn unhandled_event_type(&self, event: &Event);

    /// The reader reported the action as failed; no handler ran.
    fn action_failed(&self, event: &Event, action: &Action);

    /// The action's status was not recognised and policy said to skip it.
    fn unknown_status_skipped(&self, event: &Event, action: &Action);

    /// No handler is registered for the action type.
    fn unhandled(&self, event: &Event, action: &Action);

    /// A handler ran and failed.
    fn handler_failed(&self, event: &Event, action: &Action, error: &HandlerError);
}

/// Reports everything through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl DispatchReporter for TracingReporter {
    fn rejected(&self, err: &DispatchError) {
        warn!(error = %err, "Rejected webhook delivery");
    }

    fn unhandled_event_type(&self, event: &Event) {
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Unhandled event type"
        );
    }

    fn action_failed(&self, event: &Event, action: &Action) {
        warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            reader = ?event.reader_id(),
            action_type = %action.action_type,
            failure_code = ?action.failure_code,
            failure_message = ?action.failure_message,
            "Reader action failed"
        );
    }

    fn unknown_status_skipped(&self, event: &Event, action: &Action) {
        info!(
            event_id = %event.id,
            action_type = %action.action_type,
            "Skipping action with unrecognised status"
        );
    }

    fn unhandled(&self, event: &Event, action: &Action) {
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            action_type = %action.action_type,
            "Unhandled action type"
        );
    }

    fn handler_failed(&self, event: &Event, action: &Action, err: &HandlerError) {
        error!(
            event_id = %event.id,
            action_type = %action.action_type,
            error = %err,
            "Action handler failed"
        );
    }
}
