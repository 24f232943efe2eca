//! The configuration document as an opaque JSON tree.
//!
//! Nothing in here knows what any key means. The crate only parses raw
//! documents into objects, merges partial documents onto them and walks
//! nested sections by key path.

use serde_json::{Map, Value};
use thiserror::Error;

pub mod merge;
pub mod path;

pub use merge::{apply, merge};
pub use path::{lookup, nest, section};

/// A parsed document or patch: a JSON object with string keys.
pub type Object = Map<String, Value>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("document is not valid JSON")]
    Parse(#[source] serde_json::Error),
    #[error("document root is a {found}, expected an object")]
    NotAnObject { found: &'static str },
    #[error("config path {path} is not an object")]
    NotASection { path: String },
    #[error("section path must name at least one key")]
    EmptyPath,
}

/// Parses a raw document into its root object.
///
/// An empty input or a literal `null` is the document that does not exist
/// yet and parses to an empty object.
pub fn parse(raw: &str) -> Result<Object, DocumentError> {
    if raw.trim().is_empty() {
        return Ok(Object::new());
    }

    match serde_json::from_str(raw).map_err(DocumentError::Parse)? {
        Value::Object(root) => Ok(root),
        Value::Null => Ok(Object::new()),
        other => Err(DocumentError::NotAnObject {
            found: kind_of(&other),
        }),
    }
}

/// Human-readable name of a value's variant, for diagnostics.
#[must_use]
pub const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
