//! Webhook handling for terminal reader events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (timestamped HMAC-SHA256)
//! - Event decoding and reader action classification
//! - The action handler registry and the built-in handlers
//! - Per-delivery dispatch that ties the stages together

pub mod classify;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod parser;
pub mod registry;
pub mod signature;

pub use classify::classify;
pub use dispatch::{
    DispatchError, DispatchOutcome, DispatchStage, Dispatcher, RejectKind, SkipReason,
    UnknownStatusPolicy, WebhookConfig,
};
pub use events::{Action, ActionStatus, Event, EventKind};
pub use parser::{DecodeError, decode};
pub use registry::{ActionHandler, HandlerError, HandlerFuture, HandlerOutcome, HandlerRegistry};
pub use signature::{
    DEFAULT_TOLERANCE, SignatureHeader, VerifiedPayload, VerifyError, compute_signature,
    format_signature_header, parse_signature_header, verify, verify_at,
};
