//! Core domain types shared across the webhook core.

pub mod ids;

pub use ids::{EventId, FileId, PaymentIntentId};
