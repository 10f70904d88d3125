//! Webhook event and reader action types.
//!
//! Vendor payloads are kept as generic JSON trees ([`serde_json::Value`]) and
//! fields are read out defensively where they are needed. An absent key is a
//! normal case; only a structurally broken envelope is an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::EventId;

/// A decoded webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The vendor's event id.
    pub id: EventId,

    /// Dot-delimited event type, e.g. `terminal.reader.action_succeeded`.
    /// Never empty.
    pub event_type: String,

    /// The object at `data.object`. For reader events this is the reader,
    /// with the current action under `action`.
    pub data_object: Map<String, Value>,
}

impl Event {
    /// Classifies the event type into the families we log differently.
    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }

    /// The reader id (`data.object.id`), if the object carries one.
    pub fn reader_id(&self) -> Option<&str> {
        self.data_object.get("id").and_then(Value::as_str)
    }
}

/// Families of event type the receiver knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `terminal.reader.action_succeeded`
    ActionSucceeded,
    /// `terminal.reader.action_failed`
    ActionFailed,
    /// `terminal.reader.action_updated`, sent mid-flow by collect/confirm
    /// debit detection.
    ActionUpdated,
    /// Anything else.
    Other,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "terminal.reader.action_succeeded" => EventKind::ActionSucceeded,
            "terminal.reader.action_failed" => EventKind::ActionFailed,
            "terminal.reader.action_updated" => EventKind::ActionUpdated,
            _ => EventKind::Other,
        }
    }
}

/// The status a reader action reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Succeeded,
    Failed,
    InProgress,
    /// Missing or unrecognised status string.
    Unknown,
}

impl ActionStatus {
    /// Maps a status string case-insensitively. Unrecognised values map to
    /// [`ActionStatus::Unknown`].
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("succeeded") {
            ActionStatus::Succeeded
        } else if s.eq_ignore_ascii_case("failed") {
            ActionStatus::Failed
        } else if s.eq_ignore_ascii_case("in_progress") {
            ActionStatus::InProgress
        } else {
            ActionStatus::Unknown
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionStatus::Succeeded => "succeeded",
            ActionStatus::Failed => "failed",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A reader action extracted from an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// The discriminator, e.g. `collect_inputs`.
    pub action_type: String,

    pub status: ActionStatus,

    /// Only populated when `status` is `Failed`.
    pub failure_code: Option<String>,

    /// Only populated when `status` is `Failed`.
    pub failure_message: Option<String>,

    /// The sub-object named by `action_type`. Empty when the vendor omitted it.
    pub payload: Map<String, Value>,
}

impl Action {
    /// Returns true if the reader reported this action as failed.
    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }
}
