//! HTTP server for reader webhooks.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts signed event deliveries (200 or 400, empty body)
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use axum::http::{HeaderName, StatusCode};

use crate::webhooks::Dispatcher;

pub mod webhook;

pub use webhook::webhook_handler;

/// Default name of the header carrying the webhook signature.
pub const DEFAULT_SIGNATURE_HEADER: HeaderName = HeaderName::from_static("stripe-signature");

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Arc<Dispatcher>,

    /// Header the signature is read from.
    signature_header: HeaderName,
}

impl AppState {
    /// Creates state that reads signatures from [`DEFAULT_SIGNATURE_HEADER`].
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_signature_header(dispatcher, DEFAULT_SIGNATURE_HEADER)
    }

    pub fn with_signature_header(
        dispatcher: Arc<Dispatcher>,
        signature_header: HeaderName,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                dispatcher,
                signature_header,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn signature_header(&self) -> &HeaderName {
        &self.inner.signature_header
    }
}

/// Liveness probe. Answers `OK` without touching the dispatcher or the
/// vendor API.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
