//! JSON framing for the persistent channel.

use serde_json::{Map, Value};

use super::error::TransportError;
use super::request::Request;

pub const REQUEST_TYPE: &str = "nz_workflow_manager";
pub const RESPONSE_TYPE: &str = "nz_workflow_manager_response";

/// `{"type": REQUEST_TYPE, "action": op, "request_id": id, ...params}`
pub fn encode_request(request: &Request, request_id: &str) -> Result<String, TransportError> {
    let mut obj = Map::new();
    for (key, value) in request.params() {
        obj.insert(key.clone(), value.to_json());
    }
    obj.insert("type".into(), Value::String(REQUEST_TYPE.into()));
    obj.insert("action".into(), Value::String(request.op().into()));
    obj.insert("request_id".into(), Value::String(request_id.into()));
    serde_json::to_string(&Value::Object(obj)).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Return the payload if `text` is the reply to (`action`, `request_id`).
///
/// Replies without a `request_id` are matched on the action alone. Anything else,
/// including unparseable frames, is not ours and yields `None`.
pub fn match_response(text: &str, action: &str, request_id: &str) -> Option<Value> {
    let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    if obj.get("type").and_then(Value::as_str) != Some(RESPONSE_TYPE) {
        return None;
    }
    if obj.get("action").and_then(Value::as_str) != Some(action) {
        return None;
    }
    if let Some(id) = obj.get("request_id").and_then(Value::as_str)
        && id != request_id
    {
        return None;
    }
    Some(obj.remove("result").unwrap_or(Value::Object(obj)))
}
