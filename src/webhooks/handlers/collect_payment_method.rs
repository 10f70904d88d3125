//! Handler for `collect_payment_method` actions.
//!
//! The reader has read a card (or a phone wallet) but nothing has been charged
//! yet. The payment method details let the integration decide whether to
//! confirm, e.g. routing debit cards differently.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::effects::{ActionData, ActionSink, CollectedPaymentMethod};
use crate::types::PaymentIntentId;
use crate::webhooks::events::Action;
use crate::webhooks::registry::{ActionHandler, HandlerFuture};

use super::{action_metadata, str_at};

/// Payment method detail keys, in the order we look for them. Interac cards
/// report under their own key with the same shape.
const PRESENT_DETAIL_KEYS: [&str; 2] = ["card_present", "interac_present"];

/// Extracts card-present details from a `collect_payment_method` payload.
///
/// Every field is optional; a payload with no payment method at all still
/// yields a value with only metadata filled in.
pub fn extract_payment_method(payload: &Map<String, Value>) -> CollectedPaymentMethod {
    let details = payload
        .get("payment_method")
        .and_then(Value::as_object)
        .and_then(|pm| {
            PRESENT_DETAIL_KEYS
                .iter()
                .find_map(|key| pm.get(*key).and_then(Value::as_object))
        });

    let field = |path: &[&str]| details.and_then(|d| str_at(d, path)).map(str::to_string);

    CollectedPaymentMethod {
        metadata: action_metadata(payload),
        payment_intent: payload
            .get("payment_intent")
            .and_then(Value::as_str)
            .map(PaymentIntentId::from),
        read_method: field(&["read_method"]),
        wallet_type: field(&["wallet", "type"]),
        funding: field(&["funding"]),
        cardholder_name: field(&["cardholder_name"]),
    }
}

/// Forwards `collect_payment_method` results to the sink.
pub struct CollectPaymentMethodHandler<S> {
    sink: Arc<S>,
}

impl<S> CollectPaymentMethodHandler<S> {
    pub fn new(sink: Arc<S>) -> Self {
        CollectPaymentMethodHandler { sink }
    }
}

impl<S> ActionHandler for CollectPaymentMethodHandler<S>
where
    S: ActionSink + Send + Sync,
{
    fn handle<'a>(&'a self, action: &'a Action) -> HandlerFuture<'a> {
        Box::pin(async move {
            let method = extract_payment_method(&action.payload);
            self.sink
                .deliver(ActionData::CollectPaymentMethod(method))
                .await?;
            Ok(())
        })
    }
}
