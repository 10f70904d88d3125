//! Collaborators the webhook core calls out to.
//!
//! The core itself performs no side effects. Everything it needs from the
//! outside world goes through the traits defined here:
//! - Vendor lookups for objects that reader actions only reference by id
//! - The business-logic sink that receives extracted action fields
//! - The reporter that receives results the HTTP response doesn't carry
//!
//! Mock implementations live in the test utilities.

pub mod lookup;
pub mod report;
pub mod sink;

pub use lookup::{FileLink, FileLookup, LookupError, PaymentIntentLookup, PaymentIntentSummary};
pub use report::{DispatchReporter, TracingReporter};
pub use sink::{
    ActionData, ActionMetadata, ActionSink, CollectedInput, CollectedInputs,
    CollectedPaymentMethod, ConfirmedPaymentIntent, InputValue, LoggingSink, SinkError,
};
