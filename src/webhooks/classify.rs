//! Reader action classification.
//!
//! Pulls the `action` sub-structure out of a decoded event: its type
//! discriminator, its status and, for failed actions, the failure details.
//! Classification never fails; an event without a recognisable action simply
//! classifies to `None`.

use serde_json::{Map, Value};

use super::events::{Action, ActionStatus, Event};

/// Extracts the reader action from an event.
///
/// Returns `None` when `data.object.action` is absent, is not an object, or
/// has no string `type`. A missing or unexpected `status` classifies as
/// [`ActionStatus::Unknown`].
///
/// Failure details are only read for failed actions, and either may be
/// absent: vendor payloads do not always populate both.
pub fn classify(event: &Event) -> Option<Action> {
    let action = event.data_object.get("action")?.as_object()?;
    let action_type = action.get("type")?.as_str()?.to_string();

    let status = action
        .get("status")
        .and_then(Value::as_str)
        .map(ActionStatus::parse)
        .unwrap_or(ActionStatus::Unknown);

    let (failure_code, failure_message) = if status == ActionStatus::Failed {
        (
            string_field(action, "failure_code"),
            string_field(action, "failure_message"),
        )
    } else {
        (None, None)
    };

    let payload = action
        .get(&action_type)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(Action {
        action_type,
        status,
        failure_code,
        failure_message,
        payload,
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}
