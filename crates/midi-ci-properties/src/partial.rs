use serde_json::{Map, Value};

/// Applies a partial-update spec (JSON pointer -> replacement value) to
/// `doc`, returning the mutated copy (spec §4.7). Functional: every level is
/// rebuilt rather than mutated in place, which makes disjoint updates commute
/// trivially (P4).
///
/// Unknown intermediate paths leave that entry's contribution a no-op rather
/// than aborting the whole batch; `doc` must be a JSON object.
pub fn apply_partial_update(doc: &Value, spec: &Value) -> Value {
    let Some(updates) = spec.as_object() else {
        return doc.clone();
    };
    let mut result = doc.clone();
    for (pointer, value) in updates {
        result = apply_one_pointer(&result, pointer, value.clone());
    }
    result
}

fn apply_one_pointer(doc: &Value, pointer: &str, value: Value) -> Value {
    let segments = parse_pointer(pointer);
    if segments.is_empty() {
        return value;
    }
    set_at_path(doc, &segments, value)
}

/// Splits an RFC 6901 JSON pointer into its unescaped segments (`~1` -> `/`,
/// `~0` -> `~`), dropping the leading empty segment before the first `/`.
fn parse_pointer(pointer: &str) -> Vec<String> {
    let trimmed = pointer.strip_prefix('/').unwrap_or(pointer);
    if trimmed.is_empty() && pointer.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(unescape_segment).collect()
}

fn unescape_segment(s: &str) -> String {
    s.replace("~1", "/").replace("~0", "~")
}

fn set_at_path(doc: &Value, path: &[String], value: Value) -> Value {
    let Value::Object(map) = doc else {
        return doc.clone();
    };
    let mut new_map = map.clone();
    set_in_map(&mut new_map, path, value);
    Value::Object(new_map)
}

/// Walks objects along `path`; if any intermediate key is absent, the
/// document is left unchanged for this entry (spec §4.7: "no path creation").
fn set_in_map(map: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [only] => {
            if map.contains_key(only) {
                map.insert(only.clone(), value);
            }
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = map.get(head) {
                let mut child = child.clone();
                set_in_map(&mut child, rest, value);
                map.insert(head.clone(), Value::Object(child));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_spec_is_identity() {
        let doc = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(apply_partial_update(&doc, &json!({})), doc);
    }

    #[test]
    fn replaces_nested_value() {
        let doc = json!({"a": 1, "b": {"c": 2}});
        let updated = apply_partial_update(&doc, &json!({"/b/c": 5}));
        assert_eq!(updated, json!({"a": 1, "b": {"c": 5}}));
    }

    #[test]
    fn disjoint_pointer_updates_commute() {
        let doc = json!({"a": {"x": 1}, "b": {"y": 2}});
        let spec1 = json!({"/a/x": 10});
        let spec2 = json!({"/b/y": 20});

        let order1 = apply_partial_update(&apply_partial_update(&doc, &spec1), &spec2);
        let order2 = apply_partial_update(&apply_partial_update(&doc, &spec2), &spec1);
        assert_eq!(order1, order2);
        assert_eq!(order1, json!({"a": {"x": 10}, "b": {"y": 20}}));
    }

    #[test]
    fn missing_intermediate_path_is_a_noop() {
        let doc = json!({"a": 1});
        let updated = apply_partial_update(&doc, &json!({"/missing/x": 5}));
        assert_eq!(updated, doc);
    }

    #[test]
    fn scenario_d_subscription_partial_notify() {
        let doc = json!({"a": 1, "b": {"c": 2}});
        let updated = apply_partial_update(&doc, &json!({"/b/c": 5}));
        assert_eq!(updated, json!({"a": 1, "b": {"c": 5}}));
    }
}
