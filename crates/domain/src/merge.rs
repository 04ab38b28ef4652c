//! JSON document merging for record patches and schema upgrades
//!
//! Two rules live here:
//!
//! - [`deep_merge`]: patch application. Source wins; objects recurse,
//!   everything else (arrays included) is replaced wholesale.
//! - [`complete_with_defaults`]: backward compatibility. Only keys that are
//!   missing (or `null`) in the persisted document are filled from the
//!   canonical default; present keys are never touched.

use serde_json::Value;

/// Merge `source` over `target` in place.
///
/// Arrays are never merged element-wise: a shorter source array replaces a
/// longer target array without keeping trailing elements.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(key) {
                    Some(target_value) if target_value.is_object() && source_value.is_object() => {
                        deep_merge(target_value, source_value);
                    }
                    Some(target_value) => *target_value = source_value.clone(),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Fill keys of `defaults` that are missing from `doc`, recursively.
///
/// Returns the dotted paths that were filled in. A non-object `doc` is left
/// untouched and reported as unfilled; the caller decides whether that is a
/// malformed record.
pub fn complete_with_defaults(doc: &mut Value, defaults: &Value) -> Vec<String> {
    let mut filled = Vec::new();
    complete_at(doc, defaults, "", &mut filled);
    filled
}

fn complete_at(doc: &mut Value, defaults: &Value, prefix: &str, filled: &mut Vec<String>) {
    let (Value::Object(doc_map), Value::Object(default_map)) = (doc, defaults) else {
        return;
    };
    for (key, default_value) in default_map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match doc_map.get_mut(key) {
            None => {
                doc_map.insert(key.clone(), default_value.clone());
                filled.push(path);
            }
            Some(existing) if existing.is_null() && !default_value.is_null() => {
                *existing = default_value.clone();
                filled.push(path);
            }
            Some(existing) => complete_at(existing, default_value, &path, filled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_recurses_into_objects() {
        let mut target = json!({"attributes": {"strength": 1, "agility": 0}, "name": "A"});
        deep_merge(&mut target, &json!({"attributes": {"agility": 2}}));
        assert_eq!(
            target,
            json!({"attributes": {"strength": 1, "agility": 2}, "name": "A"})
        );
    }

    #[test]
    fn deep_merge_replaces_arrays_wholesale() {
        let mut target = json!({"hp": {"current": 3, "circles": [
            {"active": true}, {"active": true}, {"active": true}
        ]}});
        deep_merge(&mut target, &json!({"hp": {"circles": [{"active": false}]}}));
        assert_eq!(target["hp"]["circles"], json!([{"active": false}]));
        assert_eq!(target["hp"]["current"], json!(3));
    }

    #[test]
    fn deep_merge_scalar_replaces_object_and_back() {
        let mut target = json!({"details": {"age": 30}});
        deep_merge(&mut target, &json!({"details": "none"}));
        assert_eq!(target, json!({"details": "none"}));

        deep_merge(&mut target, &json!({"details": {"age": 31}}));
        assert_eq!(target, json!({"details": {"age": 31}}));
    }

    #[test]
    fn deep_merge_adds_new_keys() {
        let mut target = json!({});
        deep_merge(&mut target, &json!({"a": {"b": 1}}));
        assert_eq!(target, json!({"a": {"b": 1}}));
    }

    #[test]
    fn completion_is_additive() {
        let defaults = json!({
            "name": "",
            "hope": {"current": 0, "max": 6},
            "uiPreferences": {"theme": "dark", "collapsedSections": []},
            "equipment": []
        });
        let mut doc = json!({
            "name": "Rex",
            "hope": {"current": 3},
            "equipment": [{"item": "rope"}]
        });
        let original = doc.clone();

        let filled = complete_with_defaults(&mut doc, &defaults);

        assert_eq!(doc["name"], original["name"]);
        assert_eq!(doc["equipment"], original["equipment"]);
        assert_eq!(doc["hope"], json!({"current": 3, "max": 6}));
        assert_eq!(
            doc["uiPreferences"],
            json!({"theme": "dark", "collapsedSections": []})
        );
        assert_eq!(filled, vec!["hope.max".to_string(), "uiPreferences".to_string()]);
    }

    #[test]
    fn completion_treats_null_as_missing() {
        let mut doc = json!({"hope": null});
        complete_with_defaults(&mut doc, &json!({"hope": {"current": 0, "max": 6}}));
        assert_eq!(doc["hope"], json!({"current": 0, "max": 6}));
    }

    #[test]
    fn completion_keeps_extra_keys() {
        let mut doc = json!({"legacyField": 7});
        complete_with_defaults(&mut doc, &json!({"name": ""}));
        assert_eq!(doc, json!({"legacyField": 7, "name": ""}));
    }

    #[test]
    fn completion_ignores_non_object_documents() {
        let mut doc = json!([1, 2]);
        assert!(complete_with_defaults(&mut doc, &json!({"name": ""})).is_empty());
        assert_eq!(doc, json!([1, 2]));
    }
}
