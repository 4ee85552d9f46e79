//! Document format detection and repair.
//!
//! Three historical encodings of the same workflow are in circulation:
//! - keyed (`{"1": {"class_type": .., "inputs": {..}}, ..}`), the canonical form the host loads
//! - wrapped (`{"workflow": <document or its JSON text>}`), possibly nested
//! - node array (`{"nodes": [{"id": .., "type": ..}, ..]}`)
//!
//! `normalize` turns any of them into the keyed form. Documents it does not
//! recognize come back unchanged.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Wrapped documents are unwrapped at most this many times.
pub const MAX_UNWRAP_DEPTH: usize = 4;

const TYPE_TAG: &str = "class_type";
const TYPE_ALIAS: &str = "type";
const INPUTS: &str = "inputs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentEncoding {
    Legacy,
    Wrapped,
    NodeArray,
    Unrecognized,
}

/// A change made while normalizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    Unwrapped { depth: usize },
    ConvertedNodeArray { nodes: usize },
    TypeTagFromAlias { node: String },
    EmptyInputsAdded { node: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationFailure {
    #[error("not valid JSON: {0}")]
    Malformed(String),
    #[error("document is wrapped more than {limit} levels deep")]
    DepthExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDocument {
    pub document: Value,
    pub source_encoding: DocumentEncoding,
    pub repairs: Vec<Repair>,
}

impl NormalizedDocument {
    /// Encoding of the result, `Legacy` when normalization reached the canonical form.
    pub fn encoding(&self) -> DocumentEncoding {
        classify(&self.document)
    }
}

fn is_node_id(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn has_type_tag(node: &Value) -> bool {
    node.get(TYPE_TAG).is_some_and(Value::is_string)
}

/// Shape test, checked in order: keyed, wrapped, node array.
pub fn classify(doc: &Value) -> DocumentEncoding {
    let Some(map) = doc.as_object() else {
        return DocumentEncoding::Unrecognized;
    };

    let mut nodes = map.iter().filter(|(k, _)| is_node_id(k)).peekable();
    if nodes.peek().is_some() && nodes.all(|(_, v)| has_type_tag(v)) {
        return DocumentEncoding::Legacy;
    }
    if matches!(map.get("workflow"), Some(Value::Object(_) | Value::String(_))) {
        return DocumentEncoding::Wrapped;
    }
    if map.get("nodes").is_some_and(Value::is_array) {
        return DocumentEncoding::NodeArray;
    }
    DocumentEncoding::Unrecognized
}

fn unwrap_once(mut doc: Value) -> Result<Value, NormalizationFailure> {
    match doc.get_mut("workflow").map(Value::take) {
        Some(Value::String(text)) => {
            serde_json::from_str(&text).map_err(|e| NormalizationFailure::Malformed(e.to_string()))
        }
        Some(inner) => Ok(inner),
        None => Ok(doc),
    }
}

fn node_id(node: &Value, position: usize) -> String {
    match node.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => (position + 1).to_string(),
    }
}

fn convert_node_array(doc: &Value) -> (Value, usize) {
    let mut keyed = Map::new();
    let nodes = doc
        .get("nodes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for (position, node) in nodes.iter().enumerate() {
        if !node.is_object() {
            continue;
        }
        let class_type = node
            .get(TYPE_ALIAS)
            .or_else(|| node.get(TYPE_TAG))
            .and_then(Value::as_str)
            .unwrap_or("UnknownNode");
        let inputs = match node.get(INPUTS) {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        };

        let mut converted = Map::new();
        converted.insert(TYPE_TAG.into(), Value::String(class_type.to_string()));
        converted.insert(INPUTS.into(), inputs);
        if let Some(title) = node.get("title").and_then(Value::as_str) {
            converted.insert("_meta".into(), serde_json::json!({ "title": title }));
        }
        keyed.insert(node_id(node, position), Value::Object(converted));
    }
    let count = keyed.len();
    (Value::Object(keyed), count)
}

/// Patch keyed nodes in place: alias `type` to the type tag, add missing inputs.
fn repair_keyed(doc: &mut Value, repairs: &mut Vec<Repair>) {
    let Some(map) = doc.as_object_mut() else {
        return;
    };
    for (id, node) in map.iter_mut().filter(|(k, _)| is_node_id(k)) {
        let Some(node) = node.as_object_mut() else {
            continue;
        };
        if !node.get(TYPE_TAG).is_some_and(Value::is_string)
            && let Some(alias) = node.get(TYPE_ALIAS).and_then(Value::as_str)
        {
            let alias = alias.to_string();
            node.insert(TYPE_TAG.into(), Value::String(alias));
            repairs.push(Repair::TypeTagFromAlias { node: id.clone() });
        }
        if !node.contains_key(INPUTS) {
            node.insert(INPUTS.into(), Value::Object(Map::new()));
            repairs.push(Repair::EmptyInputsAdded { node: id.clone() });
        }
    }
}

/// Bring `doc` into the keyed encoding. Applying it to its own output changes nothing.
pub fn normalize(doc: Value) -> Result<NormalizedDocument, NormalizationFailure> {
    let source_encoding = classify(&doc);
    let mut repairs = Vec::new();
    let mut current = doc;
    let mut depth = 0;

    loop {
        match classify(&current) {
            DocumentEncoding::Wrapped => {
                if depth == MAX_UNWRAP_DEPTH {
                    return Err(NormalizationFailure::DepthExceeded {
                        limit: MAX_UNWRAP_DEPTH,
                    });
                }
                depth += 1;
                current = unwrap_once(current)?;
                repairs.push(Repair::Unwrapped { depth });
            }
            DocumentEncoding::NodeArray => {
                let (keyed, nodes) = convert_node_array(&current);
                // nothing usable in the array: hand the document back as it was
                if nodes > 0 {
                    current = keyed;
                    repairs.push(Repair::ConvertedNodeArray { nodes });
                }
                break;
            }
            DocumentEncoding::Legacy | DocumentEncoding::Unrecognized => break,
        }
    }

    repair_keyed(&mut current, &mut repairs);
    Ok(NormalizedDocument {
        document: current,
        source_encoding,
        repairs,
    })
}

/// Parse document text, then normalize it.
pub fn normalize_str(text: &str) -> Result<NormalizedDocument, NormalizationFailure> {
    let doc: Value =
        serde_json::from_str(text).map_err(|e| NormalizationFailure::Malformed(e.to_string()))?;
    normalize(doc)
}
