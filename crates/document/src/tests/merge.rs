use serde_json::{json, Value};

use super::*;

fn object(value: Value) -> Object {
    match value {
        Value::Object(object) => object,
        other => panic!("test fixture must be an object, got {other}"),
    }
}

fn merged(target: Value, patch: Value) -> Value {
    Value::Object(merge(target, &object(patch)))
}

#[test]
fn test_recursive_merge_preserves_siblings() {
    assert_eq!(
        merged(
            json!({ "a": 1, "nested": { "x": 1, "y": 2 } }),
            json!({ "nested": { "y": 3, "z": 4 } }),
        ),
        json!({ "a": 1, "nested": { "x": 1, "y": 3, "z": 4 } })
    );
}

#[test]
fn test_type_replacement_is_total() {
    assert_eq!(
        merged(json!({ "a": "s" }), json!({ "a": { "nested": true } })),
        json!({ "a": { "nested": true } })
    );
    assert_eq!(
        merged(json!({ "a": { "nested": true } }), json!({ "a": "s" })),
        json!({ "a": "s" })
    );
}

#[test]
fn test_lists_are_replaced_not_merged() {
    assert_eq!(
        merged(
            json!({ "allowFrom": ["+1", "+2"] }),
            json!({ "allowFrom": ["+3"] })
        ),
        json!({ "allowFrom": ["+3"] })
    );
}

#[test]
fn test_null_deletes_at_any_depth() {
    let document = json!({
        "keep": true,
        "channels": { "signal": { "enabled": true }, "slack": { "enabled": false } },
    });

    assert_eq!(
        merged(document.clone(), json!({ "channels": { "signal": null } })),
        json!({ "keep": true, "channels": { "slack": { "enabled": false } } })
    );
    assert_eq!(
        merged(document, json!({ "channels": null })),
        json!({ "keep": true })
    );
}

#[test]
fn test_deleting_absent_key_is_a_no_op() {
    let document = json!({ "a": 1, "b": { "c": 2 } });

    assert_eq!(merged(document.clone(), json!({ "missing": null })), document);
    assert_eq!(
        merged(document.clone(), json!({ "b": { "missing": null } })),
        document
    );
}

#[test]
fn test_new_subtree_is_stored_as_given() {
    assert_eq!(
        merged(json!({}), json!({ "a": { "b": null, "c": 1 } })),
        json!({ "a": { "b": null, "c": 1 } })
    );
    assert_eq!(
        merged(json!({ "a": "s" }), json!({ "a": { "x": null, "y": 1 } })),
        json!({ "a": { "x": null, "y": 1 } })
    );
}

#[test]
fn test_nulls_delete_inside_existing_subtree() {
    assert_eq!(
        merged(
            json!({ "a": { "x": 1, "y": 1 } }),
            json!({ "a": { "x": null, "y": 2 } })
        ),
        json!({ "a": { "y": 2 } })
    );
}

#[test]
fn test_null_target_is_an_empty_document() {
    assert_eq!(
        merged(Value::Null, json!({ "a": { "b": 1 } })),
        json!({ "a": { "b": 1 } })
    );
}

#[test]
fn test_repeated_patch_is_idempotent() {
    let documents = [
        json!({}),
        json!({ "a": 1, "b": [1, 2, 3] }),
        json!({ "gateway": { "port": 1, "bind": "loopback" }, "x": "y" }),
        json!({ "gateway": "scalar", "nested": { "deep": { "deeper": 1 } } }),
    ];
    let patches = [
        json!({ "a": 2 }),
        json!({ "gateway": { "port": 18789 } }),
        json!({ "nested": { "deep": { "other": [true, false] } }, "b": {} }),
        json!({ "gateway": { "auth": { "mode": "token" } }, "a": "now a string" }),
    ];

    for document in &documents {
        for patch in &patches {
            let once = merged(document.clone(), patch.clone());
            let twice = merged(once.clone(), patch.clone());

            assert_eq!(once, twice, "patch {patch} applied to {document}");
        }
    }
}

#[test]
fn test_untouched_keys_keep_their_values() {
    let mut target = object(json!({ "a": [1], "b": { "c": "d" }, "e": null }));

    apply(&mut target, &object(json!({ "f": 1 })));

    assert_eq!(
        Value::Object(target),
        json!({ "a": [1], "b": { "c": "d" }, "e": null, "f": 1 })
    );
}
