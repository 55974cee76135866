//! Tool schema dialect translation for Gemini function declarations.

use serde_json::Value;

/// Rewrites a JSON schema in place so Gemini accepts it: enum values become
/// strings, a node with both `enum` and `type` is typed `string`, and
/// `default`/`examples` are removed at every depth.
pub(crate) fn sanitize_schema(node: &mut Value) {
    match node {
        Value::Object(map) => {
            if let Some(Value::Array(values)) = map.get_mut("enum") {
                for value in values.iter_mut() {
                    if !value.is_string() {
                        *value = Value::String(enum_text(value));
                    }
                }
            }

            if map.contains_key("enum") && map.contains_key("type") {
                map.insert("type".to_string(), Value::String("string".to_string()));
            }

            map.remove("default");
            map.remove("examples");

            map.values_mut().for_each(sanitize_schema);
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_schema),
        _ => {}
    }
}

fn enum_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_properties_are_sanitized() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "level": {"type": "integer", "enum": [1, 2, 3], "default": 1},
                "tags": {
                    "type": "array",
                    "items": {"type": "string", "examples": ["a"]}
                }
            },
            "examples": [{"level": 1}]
        });

        sanitize_schema(&mut schema);

        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "level": {"type": "string", "enum": ["1", "2", "3"]},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            })
        );
    }
}
