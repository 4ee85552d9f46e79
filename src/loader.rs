//! Decoding of `load_workflow` replies.

use serde_json::Value;

use crate::errors::CourierError;
use crate::normalizer::{self, DocumentEncoding, NormalizedDocument};
use crate::transport::op;

fn rejected(reason: String) -> CourierError {
    CourierError::OperationRejected {
        operation: op::LOAD_WORKFLOW.to_string(),
        reason,
    }
}

/// Extract the raw document from a host reply.
///
/// The host answers with `workflow_loaded` (document text or object), `directory_listing`
/// when the path is a folder, or `error`. Replies without a `type` are taken to be the
/// document itself.
pub fn decode_load_reply(path: &str, mut reply: Value) -> Result<Value, CourierError> {
    let kind = reply.get("type").and_then(Value::as_str).map(str::to_string);
    match kind.as_deref() {
        Some("workflow_loaded") => match reply.get_mut("data").map(Value::take) {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map_err(|e| CourierError::FormatMalformed(format!("{path}: {e}"))),
            Some(Value::Null) | None => Err(CourierError::FormatMalformed(format!(
                "{path}: reply carried no document"
            ))),
            Some(doc) => Ok(doc),
        },
        Some("directory_listing") => Err(rejected(format!(
            "'{path}' is a directory, not a document"
        ))),
        Some("error") => Err(rejected(
            reply
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        )),
        _ if reply.get("success").and_then(Value::as_bool) == Some(false) => Err(rejected(
            reply
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string(),
        )),
        _ => Ok(reply),
    }
}

/// Normalize a decoded document; `strict` refuses anything that did not end up keyed.
pub fn finish(doc: Value, strict: bool) -> Result<NormalizedDocument, CourierError> {
    let normalized = normalizer::normalize(doc)?;
    if strict && normalized.encoding() != DocumentEncoding::Legacy {
        return Err(CourierError::FormatUnrecognized(
            "no usable keyed nodes, wrapper or node array found".into(),
        ));
    }
    Ok(normalized)
}
