//! The business-logic sink handlers hand extracted fields to.
//!
//! What happens to the data (writing to a database, downloading a signature,
//! crediting an account) belongs to the embedding application. The core only
//! guarantees that the right fields reach [`ActionSink::deliver`].

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::lookup::PaymentIntentSummary;
use crate::types::{FileId, PaymentIntentId};

/// Metadata tags attached to a reader action by the integration that
/// started it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionMetadata {
    pub rental_agreement: Option<String>,
    pub purpose: Option<String>,

    /// Every string-valued tag, including the two above.
    pub entries: BTreeMap<String, String>,
}

/// The value captured for one input of a `collect_inputs` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputValue {
    /// The label of the chosen selection button.
    Selection { value: String },

    /// A captured signature, resolved to a download link.
    Signature { file_id: FileId, url: String },

    /// The value of a free-form input (`text`, `email`, `phone`, `numeric`).
    Text { value: String },

    /// The input carried no value: skipped, or an input type we don't read.
    Missing,
}

/// One input of a `collect_inputs` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedInput {
    /// e.g. `selection`, `signature`.
    pub input_type: String,
    pub value: InputValue,
}

/// Fields of a `collect_inputs` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedInputs {
    pub metadata: ActionMetadata,
    pub inputs: Vec<CollectedInput>,
}

impl CollectedInputs {
    /// The first input. Readers display one form per action in the common
    /// case, so this is usually the only one.
    pub fn primary(&self) -> Option<&CollectedInput> {
        self.inputs.first()
    }
}

/// Fields of a `collect_payment_method` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedPaymentMethod {
    pub metadata: ActionMetadata,
    pub payment_intent: Option<PaymentIntentId>,

    /// How the card was read, e.g. `contactless_emv`.
    pub read_method: Option<String>,

    /// Set for mobile wallets, e.g. `apple_pay`.
    pub wallet_type: Option<String>,

    /// `credit`, `debit`, `prepaid` or `unknown`.
    pub funding: Option<String>,

    pub cardholder_name: Option<String>,
}

/// Fields of a `confirm_payment_intent` action, with the payment intent
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedPaymentIntent {
    pub payment_intent: PaymentIntentId,
    pub intent: PaymentIntentSummary,
}

/// Data delivered to the sink by the built-in handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ActionData {
    CollectInputs(CollectedInputs),
    CollectPaymentMethod(CollectedPaymentMethod),
    ConfirmPaymentIntent(ConfirmedPaymentIntent),
}

/// The sink rejected delivered data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sink error: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        SinkError {
            message: message.into(),
        }
    }
}

/// Receives the fields each built-in handler extracts.
pub trait ActionSink {
    fn deliver(&self, data: ActionData) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// A sink that only logs what it receives.
///
/// Used by the binary when no business logic is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl ActionSink for LoggingSink {
    async fn deliver(&self, data: ActionData) -> Result<(), SinkError> {
        match &data {
            ActionData::CollectInputs(collected) => {
                for input in &collected.inputs {
                    info!(
                        input_type = %input.input_type,
                        value = ?input.value,
                        rental_agreement = ?collected.metadata.rental_agreement,
                        purpose = ?collected.metadata.purpose,
                        "Collected input"
                    );
                }
            }
            ActionData::CollectPaymentMethod(method) => {
                info!(
                    cardholder_name = ?method.cardholder_name,
                    funding = ?method.funding,
                    read_method = ?method.read_method,
                    wallet = ?method.wallet_type,
                    rental_agreement = ?method.metadata.rental_agreement,
                    purpose = ?method.metadata.purpose,
                    "Collected payment method"
                );
            }
            ActionData::ConfirmPaymentIntent(confirmed) => {
                info!(
                    payment_intent = %confirmed.payment_intent,
                    status = %confirmed.intent.status,
                    amount = confirmed.intent.amount,
                    currency = %confirmed.intent.currency,
                    rental_agreement = ?confirmed.intent.rental_agreement(),
                    "Confirmed payment intent"
                );
            }
        }
        Ok(())
    }
}
