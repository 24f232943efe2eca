//! JSON merge patch over [`Object`]s, in the style of RFC 7396.
//!
//! A patch names only the keys it changes. `null` deletes, an object merges
//! into an existing object, and every other value replaces whatever was
//! there. Lists are never merged element-wise.
//!
//! An object placed where there was no object before is stored as given,
//! nulls included.

#[cfg(test)]
#[path = "tests/merge.rs"]
mod tests;

use serde_json::Value;

use crate::Object;

/// Merges `patch` onto `target` and returns the result.
///
/// A target that is not an object (including `null`) is treated as an empty
/// object, so merging onto a document that does not exist yet behaves like
/// merging onto `{}`.
#[must_use]
pub fn merge(target: Value, patch: &Object) -> Object {
    let mut target = match target {
        Value::Object(target) => target,
        _ => Object::new(),
    };

    apply(&mut target, patch);

    target
}

/// Merges `patch` onto `target` in place.
pub fn apply(target: &mut Object, patch: &Object) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                let _ignored = target.remove(key);
            }
            Value::Object(nested) => match target.get_mut(key) {
                Some(Value::Object(existing)) => apply(existing, nested),
                _ => {
                    let _ignored = target.insert(key.clone(), value.clone());
                }
            },
            _ => {
                let _ignored = target.insert(key.clone(), value.clone());
            }
        }
    }
}
