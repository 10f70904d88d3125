//! Per-delivery orchestration.
//!
//! Every delivery walks the same path:
//!
//! ```text
//! Received -> Verified -> Decoded -> Classified -> HandlerInvoked -> Responded
//!                            \------------\-------> Skipped ------/
//! ```
//!
//! Only the three reader action event types are classified; any other event
//! type is skipped right after decoding.
//!
//! Verification and decoding failures reject the delivery with 400. Once a
//! delivery is authentic and well-formed it is always acknowledged with 200,
//! even when the reader action failed or its handler errored: a non-2xx would
//! only make the vendor redeliver a payload we already have. There are no
//! retries within a delivery.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, trace};

use super::classify::classify;
use super::events::{ActionStatus, Event, EventKind};
use super::parser::{DecodeError, decode};
use super::registry::{HandlerOutcome, HandlerRegistry};
use super::signature::{DEFAULT_TOLERANCE, VerifyError, verify_at};
use crate::effects::{DispatchReporter, TracingReporter};

/// What to do with an action whose status was not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatusPolicy {
    /// Invoke the handler as if the action succeeded.
    #[default]
    Proceed,
    /// Acknowledge without invoking a handler.
    Skip,
}

impl FromStr for UnknownStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proceed" => Ok(UnknownStatusPolicy::Proceed),
            "skip" => Ok(UnknownStatusPolicy::Skip),
            other => Err(format!("expected `proceed` or `skip`, got `{other}`")),
        }
    }
}

impl fmt::Display for UnknownStatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownStatusPolicy::Proceed => f.write_str("proceed"),
            UnknownStatusPolicy::Skip => f.write_str("skip"),
        }
    }
}

/// Configuration the dispatcher consumes.
#[derive(Clone)]
pub struct WebhookConfig {
    secret: Vec<u8>,
    tolerance: Duration,
    unknown_status: UnknownStatusPolicy,
}

impl WebhookConfig {
    /// Creates a config with the default 300 s tolerance.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookConfig {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
            unknown_status: UnknownStatusPolicy::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn unknown_status(&self) -> UnknownStatusPolicy {
        self.unknown_status
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("tolerance", &self.tolerance)
            .field("unknown_status", &self.unknown_status)
            .finish_non_exhaustive()
    }
}

/// Why a delivery was rejected.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The coarse rejection categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
    SignatureInvalid,
    Stale,
    PayloadMalformed,
}

impl DispatchError {
    pub fn kind(&self) -> RejectKind {
        match self {
            DispatchError::Verify(VerifyError::SignatureInvalid) => RejectKind::SignatureInvalid,
            DispatchError::Verify(VerifyError::Stale { .. }) => RejectKind::Stale,
            DispatchError::Verify(VerifyError::PayloadMalformed(_)) => RejectKind::PayloadMalformed,
            DispatchError::Decode(_) => RejectKind::PayloadMalformed,
        }
    }
}

/// Why no handler ran for an accepted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event type is not a reader action event.
    UnhandledEventType,
    /// The event carries no reader action.
    NoAction,
    /// The reader reported the action as failed.
    ActionFailed,
    /// The status was unrecognised and [`UnknownStatusPolicy::Skip`] is set.
    UnknownStatus,
}

/// The last stage a delivery completed before the response was produced.
///
/// Rejections stop at `Received` (verification failed) or `Verified`
/// (decoding failed). Accepted deliveries end in `HandlerInvoked` or
/// `Skipped`, whose reason tells how far the event got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Verified,
    HandlerInvoked,
    Skipped(SkipReason),
}

/// The response to a delivery.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// 200 or 400. The body is always empty.
    pub status: StatusCode,
    pub stage: DispatchStage,
    pub error: Option<DispatchError>,
    pub handler: Option<HandlerOutcome>,
}

impl DispatchOutcome {
    fn rejected(stage: DispatchStage, error: DispatchError) -> Self {
        DispatchOutcome {
            status: StatusCode::BAD_REQUEST,
            stage,
            error: Some(error),
            handler: None,
        }
    }

    fn skipped(reason: SkipReason) -> Self {
        DispatchOutcome {
            status: StatusCode::OK,
            stage: DispatchStage::Skipped(reason),
            error: None,
            handler: None,
        }
    }

    fn invoked(outcome: HandlerOutcome) -> Self {
        DispatchOutcome {
            status: StatusCode::OK,
            stage: DispatchStage::HandlerInvoked,
            error: None,
            handler: Some(outcome),
        }
    }

    /// Returns true if the delivery was acknowledged.
    pub fn is_acknowledged(&self) -> bool {
        self.status.is_success()
    }
}

/// Runs deliveries through verification, decoding, classification and the
/// handler registry.
///
/// Holds no per-request state; one instance is shared by all requests.
pub struct Dispatcher {
    config: WebhookConfig,
    registry: Arc<HandlerRegistry>,
    reporter: Arc<dyn DispatchReporter>,
}

impl Dispatcher {
    /// Creates a dispatcher that reports through `tracing`.
    pub fn new(config: WebhookConfig, registry: HandlerRegistry) -> Self {
        Self::with_reporter(config, registry, Arc::new(TracingReporter))
    }

    pub fn with_reporter(
        config: WebhookConfig,
        registry: HandlerRegistry,
        reporter: Arc<dyn DispatchReporter>,
    ) -> Self {
        Dispatcher {
            config,
            registry: Arc::new(registry),
            reporter,
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatches a delivery using the current time.
    ///
    /// `signature_header` is `None` when the request carried no signature
    /// header at all.
    pub async fn dispatch(&self, body: &[u8], signature_header: Option<&str>) -> DispatchOutcome {
        self.dispatch_at(body, signature_header, Utc::now()).await
    }

    /// Dispatches a delivery as of `now`.
    pub async fn dispatch_at(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let Some(signature_header) = signature_header else {
            return self.reject(
                DispatchStage::Received,
                VerifyError::PayloadMalformed("missing signature header".to_string()).into(),
            );
        };

        let verified = match verify_at(
            body,
            signature_header,
            self.config.secret(),
            self.config.tolerance(),
            now,
        ) {
            Ok(verified) => verified,
            Err(e) => return self.reject(DispatchStage::Received, e.into()),
        };

        let event = match decode(&verified) {
            Ok(event) => event,
            Err(e) => return self.reject(DispatchStage::Verified, e.into()),
        };

        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            kind = ?event.kind(),
            "Decoded webhook event"
        );
        trace!(event_id = %event.id, object = ?event.data_object, "Event data object");

        self.dispatch_event(&event).await
    }

    /// Classifies a decoded event and invokes its handler.
    async fn dispatch_event(&self, event: &Event) -> DispatchOutcome {
        if event.kind() == EventKind::Other {
            self.reporter.unhandled_event_type(event);
            return DispatchOutcome::skipped(SkipReason::UnhandledEventType);
        }

        let Some(action) = classify(event) else {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Event carries no reader action; acknowledging"
            );
            return DispatchOutcome::skipped(SkipReason::NoAction);
        };

        debug!(
            event_id = %event.id,
            action_type = %action.action_type,
            status = %action.status,
            "Classified reader action"
        );

        if action.is_failed() {
            self.reporter.action_failed(event, &action);
            return DispatchOutcome::skipped(SkipReason::ActionFailed);
        }

        if action.status == ActionStatus::Unknown
            && self.config.unknown_status() == UnknownStatusPolicy::Skip
        {
            self.reporter.unknown_status_skipped(event, &action);
            return DispatchOutcome::skipped(SkipReason::UnknownStatus);
        }

        let outcome = self.registry.invoke(&action.action_type, &action).await;

        if !outcome.handled {
            self.reporter.unhandled(event, &action);
        } else if let Some(err) = &outcome.error {
            self.reporter.handler_failed(event, &action, err);
        }

        DispatchOutcome::invoked(outcome)
    }

    fn reject(&self, stage: DispatchStage, error: DispatchError) -> DispatchOutcome {
        self.reporter.rejected(&error);
        DispatchOutcome::rejected(stage, error)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
