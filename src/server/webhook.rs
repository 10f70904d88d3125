//! Webhook endpoint handler.
//!
//! Reads the raw body and the signature header and hands both to the
//! dispatcher. Bytes are passed through untouched: verification is over the
//! exact bytes the vendor signed, so nothing may parse or re-encode them first.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, info};

use super::AppState;

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - Signature header (`Stripe-Signature` unless configured otherwise):
///     `t=<unix seconds>,v1=<hex hmac>[,v1=...]`
/// - Body: JSON event
///
/// # Response
///
/// Always an empty body.
///
/// - 200 OK: Authentic, well-formed delivery. Includes failed reader actions,
///   unhandled action types and handler errors.
/// - 400 Bad Request: Missing or invalid signature, stale timestamp, or an
///   undecodable event.
///
/// # Example
///
/// ```ignore
/// POST /webhook HTTP/1.1
/// Stripe-Signature: t=1700000000,v1=5257a869...
/// Content-Type: application/json
///
/// {"id": "evt_...", "type": "terminal.reader.action_succeeded", "data": {...}}
///
/// HTTP/1.1 200 OK
/// ```
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = match headers.get(app_state.signature_header()) {
        Some(value) => match value.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                debug!("Signature header is not valid UTF-8");
                Some("")
            }
        },
        None => None,
    };

    debug!(
        body_len = body.len(),
        has_signature = signature.is_some(),
        "Received webhook"
    );

    let outcome = app_state.dispatcher().dispatch(&body, signature).await;

    info!(
        status = outcome.status.as_u16(),
        stage = ?outcome.stage,
        "Webhook delivery processed"
    );

    outcome.status
}
