//! Handler for `confirm_payment_intent` actions.
//!
//! The action only carries the payment intent id. Status, amount, currency and
//! metadata (which lives on the payment intent, not the action) come from a
//! lookup against the vendor API.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::effects::{ActionData, ActionSink, ConfirmedPaymentIntent, PaymentIntentLookup};
use crate::types::PaymentIntentId;
use crate::webhooks::events::Action;
use crate::webhooks::registry::{ActionHandler, HandlerError, HandlerFuture};

/// Reads the payment intent id from the payload and resolves it.
pub async fn resolve_payment_intent<L>(
    payload: &Map<String, Value>,
    intents: &L,
) -> Result<ConfirmedPaymentIntent, HandlerError>
where
    L: PaymentIntentLookup + Sync,
{
    let id = payload
        .get("payment_intent")
        .and_then(Value::as_str)
        .map(PaymentIntentId::from)
        .ok_or(HandlerError::MissingField("payment_intent"))?;

    let intent = intents.retrieve_payment_intent(&id).await?;

    Ok(ConfirmedPaymentIntent {
        payment_intent: id,
        intent,
    })
}

/// Forwards resolved `confirm_payment_intent` results to the sink.
pub struct ConfirmPaymentIntentHandler<L, S> {
    intents: Arc<L>,
    sink: Arc<S>,
}

impl<L, S> ConfirmPaymentIntentHandler<L, S> {
    pub fn new(intents: Arc<L>, sink: Arc<S>) -> Self {
        ConfirmPaymentIntentHandler { intents, sink }
    }
}

impl<L, S> ActionHandler for ConfirmPaymentIntentHandler<L, S>
where
    L: PaymentIntentLookup + Send + Sync,
    S: ActionSink + Send + Sync,
{
    fn handle<'a>(&'a self, action: &'a Action) -> HandlerFuture<'a> {
        Box::pin(async move {
            let confirmed = resolve_payment_intent(&action.payload, self.intents.as_ref()).await?;
            self.sink
                .deliver(ActionData::ConfirmPaymentIntent(confirmed))
                .await?;
            Ok(())
        })
    }
}
