//! Built-in handlers for reader action types.
//!
//! Each handler reads only the fields its action type defines, tolerating any
//! of them being absent, and forwards what it found to the [`ActionSink`].
//!
//! # Action Types
//!
//! | Action type | Handler |
//! |-------------|---------|
//! | `collect_inputs` | [`CollectInputsHandler`] - form input values, signature files |
//! | `collect_payment_method` | [`CollectPaymentMethodHandler`] - card-present details |
//! | `confirm_payment_intent` | [`ConfirmPaymentIntentHandler`] - resolved payment intent |

mod collect_inputs;
mod collect_payment_method;
mod confirm_payment_intent;

use std::sync::Arc;

use serde_json::{Map, Value};

use super::registry::HandlerRegistry;
use crate::effects::{ActionMetadata, ActionSink, FileLookup, PaymentIntentLookup};

pub use collect_inputs::{CollectInputsHandler, extract_collect_inputs};
pub use collect_payment_method::{CollectPaymentMethodHandler, extract_payment_method};
pub use confirm_payment_intent::{ConfirmPaymentIntentHandler, resolve_payment_intent};

pub const COLLECT_INPUTS: &str = "collect_inputs";
pub const COLLECT_PAYMENT_METHOD: &str = "collect_payment_method";
pub const CONFIRM_PAYMENT_INTENT: &str = "confirm_payment_intent";

impl HandlerRegistry {
    /// Creates a registry with the three built-in handlers registered.
    ///
    /// `api` serves both vendor lookups; in production it is a single
    /// [`crate::api::ApiClient`].
    pub fn with_builtin_handlers<A, S>(api: Arc<A>, sink: Arc<S>) -> Self
    where
        A: FileLookup + PaymentIntentLookup + Send + Sync + 'static,
        S: ActionSink + Send + Sync + 'static,
    {
        let mut registry = HandlerRegistry::new();
        registry.register(
            COLLECT_INPUTS,
            CollectInputsHandler::new(Arc::clone(&api), Arc::clone(&sink)),
        );
        registry.register(
            COLLECT_PAYMENT_METHOD,
            CollectPaymentMethodHandler::new(Arc::clone(&sink)),
        );
        registry.register(
            CONFIRM_PAYMENT_INTENT,
            ConfirmPaymentIntentHandler::new(api, sink),
        );
        registry
    }
}

/// Reads the `metadata` tags attached to an action payload.
///
/// Missing metadata, or non-string values, are skipped rather than treated as
/// errors.
pub fn action_metadata(payload: &Map<String, Value>) -> ActionMetadata {
    let entries: std::collections::BTreeMap<String, String> = payload
        .get("metadata")
        .and_then(Value::as_object)
        .map(|metadata| {
            metadata
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    ActionMetadata {
        rental_agreement: entries.get("rental_agreement").cloned(),
        purpose: entries.get("purpose").cloned(),
        entries,
    }
}

/// Reads a string at a nested path of object keys.
pub(crate) fn str_at<'a>(value: &'a Map<String, Value>, path: &[&str]) -> Option<&'a str> {
    let (last, parents) = path.split_last()?;
    let mut object = value;
    for key in parents {
        object = object.get(*key)?.as_object()?;
    }
    object.get(*last)?.as_str()
}
