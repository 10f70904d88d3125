//! Handler for `collect_inputs` actions.
//!
//! A `collect_inputs` action shows one or more forms on the reader: a row of
//! selection buttons, a signature pad, free-form text. Each input reports its
//! `type` and, under a key named after the type, the captured `value`.
//! Signatures come back as the id of an uploaded file, which we resolve to a
//! download link before handing them on.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::effects::{
    ActionData, ActionSink, CollectedInput, CollectedInputs, FileLookup, InputValue,
};
use crate::types::FileId;
use crate::webhooks::events::Action;
use crate::webhooks::registry::{ActionHandler, HandlerError, HandlerFuture};

use super::{action_metadata, str_at};

/// Extracts metadata and every input from a `collect_inputs` payload.
///
/// Inputs without a `type` are skipped. Skipped inputs, and inputs without a
/// value, yield [`InputValue::Missing`]. A signature whose file cannot be
/// resolved fails the whole extraction with
/// [`HandlerError::CollaboratorUnavailable`].
pub async fn extract_collect_inputs<F>(
    payload: &Map<String, Value>,
    files: &F,
) -> Result<CollectedInputs, HandlerError>
where
    F: FileLookup + Sync,
{
    let mut inputs = Vec::new();

    let raw_inputs = payload
        .get("inputs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for input in raw_inputs.iter().filter_map(Value::as_object) {
        let Some(input_type) = input.get("type").and_then(Value::as_str) else {
            debug!("Skipping collected input without a type");
            continue;
        };

        let skipped = input
            .get("skipped")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let raw_value = str_at(input, &[input_type, "value"]);

        let value = match (input_type, raw_value) {
            (_, None) => InputValue::Missing,
            _ if skipped => InputValue::Missing,
            ("selection", Some(v)) => InputValue::Selection {
                value: v.to_string(),
            },
            ("signature", Some(file_id)) => {
                let link = files.retrieve_file(&FileId::new(file_id)).await?;
                InputValue::Signature {
                    file_id: link.id,
                    url: link.url,
                }
            }
            (_, Some(v)) => InputValue::Text {
                value: v.to_string(),
            },
        };

        inputs.push(CollectedInput {
            input_type: input_type.to_string(),
            value,
        });
    }

    Ok(CollectedInputs {
        metadata: action_metadata(payload),
        inputs,
    })
}

/// Forwards `collect_inputs` results to the sink.
pub struct CollectInputsHandler<F, S> {
    files: Arc<F>,
    sink: Arc<S>,
}

impl<F, S> CollectInputsHandler<F, S> {
    pub fn new(files: Arc<F>, sink: Arc<S>) -> Self {
        CollectInputsHandler { files, sink }
    }
}

impl<F, S> ActionHandler for CollectInputsHandler<F, S>
where
    F: FileLookup + Send + Sync,
    S: ActionSink + Send + Sync,
{
    fn handle<'a>(&'a self, action: &'a Action) -> HandlerFuture<'a> {
        Box::pin(async move {
            let collected = extract_collect_inputs(&action.payload, self.files.as_ref()).await?;
            self.sink
                .deliver(ActionData::CollectInputs(collected))
                .await?;
            Ok(())
        })
    }
}
