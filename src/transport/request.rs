//! Request value sent through the dispatcher.
//! Immutable once built; equality is by value.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Operation names understood by the host.
pub mod op {
    pub const CREATE_DIRECTORY: &str = "create_directory";
    pub const DELETE_DIRECTORY: &str = "delete_directory";
    pub const DELETE_FILE: &str = "delete_file";
    pub const RENAME: &str = "rename";
    pub const MOVE_FILE: &str = "move_file";
    pub const MOVE_DIRECTORY: &str = "move_directory";
    pub const COPY_FILE: &str = "copy_file";
    pub const COPY_DIRECTORY: &str = "copy_directory";
    pub const PATH_EXISTS: &str = "path_exists";
    pub const LIST_DIRECTORY: &str = "list_directory";
    pub const LOAD_WORKFLOW: &str = "load_workflow";
    pub const SAVE_WORKFLOW: &str = "save_workflow";

    /// Operations that change state on the host.
    pub fn is_mutating(name: &str) -> bool {
        matches!(
            name,
            CREATE_DIRECTORY
                | DELETE_DIRECTORY
                | DELETE_FILE
                | RENAME
                | MOVE_FILE
                | MOVE_DIRECTORY
                | COPY_FILE
                | COPY_DIRECTORY
                | SAVE_WORKFLOW
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Str(s.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

/// An operation name plus flat named parameters and an optional primary-channel timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    op: String,
    params: BTreeMap<String, ParamValue>,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            params: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add the parameter only when a value is present.
    pub fn param_opt<V: Into<ParamValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(ParamValue::as_str)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_mutating(&self) -> bool {
        op::is_mutating(&self.op)
    }

    /// Parameters rendered as query pairs, in key order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        let a = Request::new(op::COPY_FILE)
            .param("source_path", "/w/a.json")
            .param("overwrite", true);
        let b = Request::new(op::COPY_FILE)
            .param("overwrite", true)
            .param("source_path", "/w/a.json");
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_timeout(Duration::from_secs(1)));
    }

    #[test]
    fn param_opt_skips_missing_values() {
        let r = Request::new(op::COPY_FILE).param_opt("new_name", None::<&str>);
        assert!(r.params().is_empty());
        let r = r.param_opt("new_name", Some("b.json"));
        assert_eq!(r.get_str("new_name"), Some("b.json"));
    }

    #[test]
    fn query_pairs_render_primitives() {
        let r = Request::new(op::MOVE_FILE)
            .param("overwrite", true)
            .param("depth", 2i64)
            .param("source_path", "C:\\w\\a.json");
        assert_eq!(
            r.query_pairs(),
            vec![
                ("depth".to_string(), "2".to_string()),
                ("overwrite".to_string(), "true".to_string()),
                ("source_path".to_string(), "C:\\w\\a.json".to_string()),
            ]
        );
    }

    #[test]
    fn mutating_classification() {
        assert!(Request::new(op::DELETE_FILE).is_mutating());
        assert!(!Request::new(op::PATH_EXISTS).is_mutating());
        assert!(!Request::new(op::LIST_DIRECTORY).is_mutating());
    }
}
