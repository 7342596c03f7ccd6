use serde_json::Value;

/// Merge `overlay` into `base`
///
/// Objects merge key by key, recursively; anything else in `overlay`
/// (scalars, arrays, null) replaces the value in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (b, o) => *b = o,
    }
}

/// `deep_merge` over a fresh copy of `base`
pub fn merged(base: &Value, overlay: &Value) -> Value {
    let mut out = base.clone();
    deep_merge(&mut out, overlay.clone());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_merge_recursively() {
        let mut base = json!({ "a": { "x": 1, "y": 2 }, "b": 1 });
        deep_merge(&mut base, json!({ "a": { "y": 3, "z": 4 }, "c": true }));
        assert_eq!(base, json!({ "a": { "x": 1, "y": 3, "z": 4 }, "b": 1, "c": true }));
    }

    #[test]
    fn test_arrays_and_scalars_replace() {
        let base = json!({ "required": ["id", "name"], "n": 1, "o": { "k": 1 } });
        let out = merged(&base, &json!({ "required": ["title"], "n": "one", "o": null }));
        assert_eq!(out, json!({ "required": ["title"], "n": "one", "o": null }));
    }

    #[test]
    fn test_key_order_is_base_first() {
        let out = merged(&json!({ "id": 1, "b": 2 }), &json!({ "z": 0, "id": 3 }));
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "b", "z"]);
    }
}
