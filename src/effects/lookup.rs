//! Vendor lookups the built-in handlers depend on.
//!
//! Reader actions only carry ids. Resolving a payment intent's status and
//! amount, or a signature file's download URL, takes a round trip to the
//! vendor API. These traits describe those round trips so the handlers can be
//! exercised against mocks; [`crate::api::ApiClient`] implements both against
//! the real API.
//!
//! # Example (mock for testing)
//!
//! ```ignore
//! struct FixedLookup(PaymentIntentSummary);
//!
//! impl PaymentIntentLookup for FixedLookup {
//!     async fn retrieve_payment_intent(
//!         &self,
//!         _id: &PaymentIntentId,
//!     ) -> Result<PaymentIntentSummary, LookupError> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{FileId, PaymentIntentId};

/// The fields of a payment intent the confirm handler reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentSummary {
    pub id: PaymentIntentId,

    /// e.g. `requires_capture`, `succeeded`.
    pub status: String,

    /// Amount in the currency's smallest unit.
    pub amount: i64,

    /// Three-letter ISO currency code, lowercase.
    pub currency: String,

    /// Metadata lives on the payment intent itself, not on the reader action.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntentSummary {
    /// The `rental_agreement` metadata tag, if set.
    pub fn rental_agreement(&self) -> Option<&str> {
        self.metadata.get("rental_agreement").map(String::as_str)
    }
}

/// Where an uploaded file can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub id: FileId,

    /// Download URL. Fetching it requires the secret API key.
    pub url: String,
}

/// A lookup against the vendor API failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The referenced object does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Timeouts, rate limits and server errors. The vendor will redeliver the
    /// webhook if the embedding application chooses to fail it.
    #[error("transient lookup failure: {0}")]
    Transient(String),

    /// Anything else: bad credentials, unexpected response shape.
    #[error("lookup failed: {0}")]
    Permanent(String),
}

impl LookupError {
    /// Returns true if retrying the same lookup later may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }
}

/// Resolves a payment intent id to its current state.
pub trait PaymentIntentLookup {
    fn retrieve_payment_intent(
        &self,
        id: &PaymentIntentId,
    ) -> impl Future<Output = Result<PaymentIntentSummary, LookupError>> + Send;
}

/// Resolves an uploaded file id to a download link.
pub trait FileLookup {
    fn retrieve_file(
        &self,
        id: &FileId,
    ) -> impl Future<Output = Result<FileLink, LookupError>> + Send;
}
