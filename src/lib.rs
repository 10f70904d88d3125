//! Reader Webhook - verification and dispatch of terminal reader webhooks.
//!
//! Deliveries are verified against a timestamped HMAC signature, decoded into
//! events, classified by their reader action, and routed to registered
//! handlers. The built-in handlers extract the fields a point-of-sale backend
//! needs and hand them to an [`effects::ActionSink`].

pub mod api;
pub mod effects;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
