//! Navigation over nested sections of a document by key path.

#[cfg(test)]
#[path = "tests/path.rs"]
mod tests;

use serde_json::Value;

use crate::{DocumentError, Object};

/// Follows `path` through nested objects.
///
/// Returns `None` when a segment is missing or when an intermediate value is
/// not an object. An empty path has no value to point at and also yields
/// `None`.
pub fn lookup<'a, S: AsRef<str>>(root: &'a Object, path: &[S]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;

    rest.iter().try_fold(root.get(first.as_ref())?, |current, key| {
        current.as_object()?.get(key.as_ref())
    })
}

/// Resolves the object stored at `path`.
///
/// A missing segment (or an explicit `null`) means the section does not exist
/// yet and yields `Ok(None)`. A segment holding anything other than an object
/// is a structural error naming the offending prefix. The empty path resolves
/// to the root itself.
pub fn section<'a, S: AsRef<str>>(
    root: &'a Object,
    path: &[S],
) -> Result<Option<&'a Object>, DocumentError> {
    let mut current = root;

    for (depth, key) in path.iter().enumerate() {
        match current.get(key.as_ref()) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(nested)) => current = nested,
            Some(_) => {
                return Err(DocumentError::NotASection {
                    path: join(&path[..=depth]),
                })
            }
        }
    }

    Ok(Some(current))
}

/// Builds the smallest patch that places `value` at `path`.
///
/// `nest(json!(1), &["a", "b"])` is `{"a": {"b": 1}}`.
pub fn nest<S: AsRef<str>>(value: Value, path: &[S]) -> Result<Object, DocumentError> {
    let (innermost, outer) = path.split_last().ok_or(DocumentError::EmptyPath)?;

    let mut patch = Object::new();
    let _ignored = patch.insert(innermost.as_ref().to_owned(), value);

    Ok(outer.iter().rev().fold(patch, |inner, key| {
        let mut wrapper = Object::new();
        let _ignored = wrapper.insert(key.as_ref().to_owned(), Value::Object(inner));
        wrapper
    }))
}

fn join<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}
