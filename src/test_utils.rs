//! Shared test utilities: signed deliveries, event builders and mock
//! collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use crate::effects::{
    ActionData, ActionSink, DispatchReporter, FileLink, FileLookup, LookupError,
    PaymentIntentLookup, PaymentIntentSummary, SinkError,
};
use crate::types::{FileId, PaymentIntentId};
use crate::webhooks::{
    Action, DEFAULT_TOLERANCE, DispatchError, Event, HandlerError, VerifiedPayload,
    compute_signature, format_signature_header, verify,
};

pub const TEST_SECRET: &[u8] = b"whsec_test_secret";

/// A fixed clock for tests that sign with an explicit timestamp.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// Builds a signature header for `body` signed at `timestamp`.
pub fn sign(body: &[u8], secret: &[u8], timestamp: i64) -> String {
    let sig = compute_signature(timestamp, body, secret);
    format_signature_header(timestamp, &[sig])
}

/// Signs and verifies `body` as of now.
pub fn verified_payload(body: &Value) -> VerifiedPayload {
    let bytes = serde_json::to_vec(body).unwrap();
    let header = sign(&bytes, TEST_SECRET, Utc::now().timestamp());
    verify(&bytes, &header, TEST_SECRET, DEFAULT_TOLERANCE).unwrap()
}

/// A reader event of `event_type` whose reader carries `action`.
pub fn reader_event(event_type: &str, action: Value) -> Value {
    json!({
        "id": "evt_test",
        "object": "event",
        "type": event_type,
        "data": {
            "object": {
                "id": "tmr_test",
                "object": "terminal.reader",
                "device_type": "bbpos_wisepos_e",
                "action": action
            }
        }
    })
}

pub fn payment_intent_summary(id: &str) -> PaymentIntentSummary {
    PaymentIntentSummary {
        id: PaymentIntentId::new(id),
        status: "requires_capture".to_string(),
        amount: 1099,
        currency: "usd".to_string(),
        metadata: BTreeMap::from([("rental_agreement".to_string(), "RA-42".to_string())]),
    }
}

/// Lookups answered from in-memory tables.
#[derive(Debug, Default)]
pub struct StaticLookup {
    files: HashMap<String, String>,
    intents: HashMap<String, PaymentIntentSummary>,
    unavailable: bool,
}

impl StaticLookup {
    pub fn with_file(mut self, id: &str, url: &str) -> Self {
        self.files.insert(id.to_string(), url.to_string());
        self
    }

    pub fn with_payment_intent(mut self, summary: PaymentIntentSummary) -> Self {
        self.intents.insert(summary.id.to_string(), summary);
        self
    }

    /// Every lookup fails with a transient error.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl FileLookup for StaticLookup {
    async fn retrieve_file(&self, id: &FileId) -> Result<FileLink, LookupError> {
        if self.unavailable {
            return Err(LookupError::Transient("service unavailable".to_string()));
        }
        self.files
            .get(id.as_str())
            .map(|url| FileLink {
                id: id.clone(),
                url: url.clone(),
            })
            .ok_or_else(|| LookupError::NotFound {
                kind: "file",
                id: id.to_string(),
            })
    }
}

impl PaymentIntentLookup for StaticLookup {
    async fn retrieve_payment_intent(
        &self,
        id: &PaymentIntentId,
    ) -> Result<PaymentIntentSummary, LookupError> {
        if self.unavailable {
            return Err(LookupError::Transient("service unavailable".to_string()));
        }
        self.intents
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                kind: "payment_intent",
                id: id.to_string(),
            })
    }
}

/// A sink that records everything delivered to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<ActionData>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    /// A sink that rejects every delivery with `message`.
    pub fn failing(message: &str) -> Self {
        RecordingSink {
            delivered: Mutex::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn delivered(&self) -> Vec<ActionData> {
        self.delivered.lock().unwrap().clone()
    }
}

impl ActionSink for RecordingSink {
    async fn deliver(&self, data: ActionData) -> Result<(), SinkError> {
        if let Some(message) = &self.fail_with {
            return Err(SinkError::new(message.clone()));
        }
        self.delivered.lock().unwrap().push(data);
        Ok(())
    }
}

/// What a [`RecordingReporter`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Rejected(String),
    UnhandledEventType(String),
    ActionFailed {
        failure_code: Option<String>,
        failure_message: Option<String>,
    },
    UnknownStatusSkipped,
    Unhandled(String),
    HandlerFailed(String, HandlerError),
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    fn push(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }
}

impl DispatchReporter for RecordingReporter {
    fn rejected(&self, error: &DispatchError) {
        self.push(Report::Rejected(error.to_string()));
    }

    fn unhandled_event_type(&self, event: &Event) {
        self.push(Report::UnhandledEventType(event.event_type.clone()));
    }

    fn action_failed(&self, _event: &Event, action: &Action) {
        self.push(Report::ActionFailed {
            failure_code: action.failure_code.clone(),
            failure_message: action.failure_message.clone(),
        });
    }

    fn unknown_status_skipped(&self, _event: &Event, _action: &Action) {
        self.push(Report::UnknownStatusSkipped);
    }

    fn unhandled(&self, _event: &Event, action: &Action) {
        self.push(Report::Unhandled(action.action_type.clone()));
    }

    fn handler_failed(&self, _event: &Event, action: &Action, error: &HandlerError) {
        self.push(Report::HandlerFailed(
            action.action_type.clone(),
            error.clone(),
        ));
    }
}
