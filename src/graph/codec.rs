//! Strict JSON boundary for nodes
//!
//! `id`, `query` and `response` are mandatory strings. Every other field has
//! an explicit default, so older or sparser records still load, but a record
//! missing its identity or content is rejected with a typed error instead of
//! being silently patched.

use super::node::FaqNode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors decoding a node from JSON
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' should be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("malformed node: {0}")]
    Malformed(String),
}

const REQUIRED_STRINGS: [&str; 3] = ["id", "query", "response"];

/// Encode a node into its JSON-compatible form
pub fn encode_node(node: &FaqNode) -> Result<Value, serde_json::Error> {
    serde_json::to_value(node)
}

/// Decode a node, enforcing required fields
pub fn decode_node(value: &Value) -> Result<FaqNode, DecodeError> {
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    check_required(object)?;
    serde_json::from_value(value.clone()).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Decode an array of nodes, failing on the first bad record
pub fn decode_nodes(value: &Value) -> Result<Vec<FaqNode>, DecodeError> {
    let items = value.as_array().ok_or(DecodeError::Malformed(
        "expected a JSON array of nodes".to_string(),
    ))?;
    items.iter().map(decode_node).collect()
}

fn check_required(object: &Map<String, Value>) -> Result<(), DecodeError> {
    for field in REQUIRED_STRINGS {
        match object.get(field) {
            None => return Err(DecodeError::MissingField(field)),
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(DecodeError::TypeMismatch {
                    field,
                    expected: "a string",
                })
            }
        }
    }
    Ok(())
}
