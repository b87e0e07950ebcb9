//! Shared constants and cheap text checks.

use serde_json::Value;

/// Dialect URI that marks a text blob as JSON-Schema.
pub const DRAFT04_MARKER: &str = "http://json-schema.org/draft-04/schema";

/// Reference key.
pub const REF_KEY: &str = "$ref";

/// Reference value meaning "this document"; never expanded.
pub const SELF_REF: &str = "#";

/// Key under which resource nodes carry inline schema text.
pub const SCHEMA_KEY: &str = "schema";

/// Key holding a schema's declared identity.
pub const ID_KEY: &str = "id";

/// Returns true if the text declares the draft-04 dialect.
pub fn is_json_schema(text: &str) -> bool {
    text.contains(DRAFT04_MARKER)
}

/// Returns true if the text is JSON-Schema and mentions `$ref` anywhere.
///
/// This is a substring test on purpose: it avoids parsing plain text or
/// non-schema JSON at all.
pub fn needs_expansion(text: &str) -> bool {
    text.contains(REF_KEY) && is_json_schema(text)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Returns the declared `id` of a schema document, if it is a non-empty string.
pub fn schema_id(value: &Value) -> Option<&str> {
    value
        .get(ID_KEY)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_draft04_marker() {
        assert!(is_json_schema(
            r#"{"$schema": "http://json-schema.org/draft-04/schema#"}"#
        ));
        assert!(!is_json_schema(
            r#"{"$schema": "http://json-schema.org/draft-07/schema#"}"#
        ));
        assert!(!is_json_schema("plain text"));
    }

    #[test]
    fn expansion_needs_marker_and_ref() {
        let with_ref =
            r#"{"$schema": "http://json-schema.org/draft-04/schema#", "$ref": "a.json"}"#;
        let without_ref = r#"{"$schema": "http://json-schema.org/draft-04/schema#"}"#;
        let openapi_ref = r##"{"$ref": "#/components/schemas/Pet"}"##;

        assert!(needs_expansion(with_ref));
        assert!(!needs_expansion(without_ref));
        assert!(!needs_expansion(openapi_ref));
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/schema.json"));
        assert!(is_url("http://example.com/schema.json"));
        assert!(!is_url("schemas/user.json"));
        assert!(!is_url("/abs/user.json"));
    }

    #[test]
    fn schema_id_ignores_empty_and_non_string() {
        assert_eq!(schema_id(&json!({"id": "a/b.json"})), Some("a/b.json"));
        assert_eq!(schema_id(&json!({"id": ""})), None);
        assert_eq!(schema_id(&json!({"id": 7})), None);
        assert_eq!(schema_id(&json!({"type": "string"})), None);
    }
}
