//! Schemas the extracted data is validated against.
//!
//! A schema is a capability object: the validator and the model client only
//! see [`ExtractionSchema`], so callers can register their own shapes next to
//! the built-in catalog.

pub mod catalog;

use jsonschema::JSONSchema;
use serde_json::{Map, Value};

use crate::errors::ScrapeError;

pub use catalog::{lookup, schema_names};

/// Custom JSON Schema format accepted only for absolute http(s) URLs.
pub const HTTP_URL_FORMAT: &str = "http-url";

pub trait ExtractionSchema: Send + Sync {
    fn name(&self) -> &str;

    /// JSON Schema document shown to the model and used for validation.
    fn json_schema(&self) -> &Value;

    /// Top-level fields that must be present for a complete record.
    fn required_fields(&self) -> Vec<String>;

    /// Strict parse. Returns the normalized record (defaults filled in) or
    /// one message per violated constraint.
    fn parse(&self, raw: &Value) -> Result<Value, Vec<String>>;
}

/// [`ExtractionSchema`] backed by a compiled JSON Schema document.
pub struct JsonSchemaSpec {
    name: String,
    schema: Value,
    compiled: JSONSchema,
}

impl std::fmt::Debug for JsonSchemaSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaSpec").field("name", &self.name).finish()
    }
}

impl JsonSchemaSpec {
    pub fn compile(name: &str, schema: Value) -> Result<Self, ScrapeError> {
        let compiled = JSONSchema::options()
            .should_validate_formats(true)
            .with_format(HTTP_URL_FORMAT, is_http_url)
            .compile(&schema)
            .map_err(|e| ScrapeError::Config(format!("Schema '{}' does not compile: {}", name, e)))?;
        Ok(Self { name: name.to_string(), schema, compiled })
    }
}

impl ExtractionSchema for JsonSchemaSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn json_schema(&self) -> &Value {
        &self.schema
    }

    fn required_fields(&self) -> Vec<String> {
        self.schema["required"]
            .as_array()
            .map(|fields| fields.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    fn parse(&self, raw: &Value) -> Result<Value, Vec<String>> {
        let mut normalized = raw.clone();
        apply_defaults(&mut normalized, &self.schema);

        let outcome = self.compiled.validate(&normalized).map_err(|errors| {
            errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() { e.to_string() } else { format!("{} at {}", e, path) }
                })
                .collect::<Vec<String>>()
        });
        outcome.map(|_| normalized)
    }
}

pub fn is_http_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Whether a property schema admits `null`.
pub(crate) fn allows_null(schema: &Value) -> bool {
    match &schema["type"] {
        Value::String(t) => t == "null",
        Value::Array(types) => types.iter().any(|t| t == "null"),
        _ => false,
    }
}

pub(crate) fn allows_type(schema: &Value, wanted: &str) -> bool {
    match &schema["type"] {
        Value::String(t) => t == wanted,
        Value::Array(types) => types.iter().any(|t| t == wanted),
        _ => false,
    }
}

/// Fill missing properties with their declared default, or null when the
/// property is optional and nullable. Recurses into nested objects and arrays.
pub fn apply_defaults(value: &mut Value, schema: &Value) {
    match value {
        Value::Object(map) => fill_object(map, schema),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items.iter_mut() {
                    apply_defaults(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

fn fill_object(map: &mut Map<String, Value>, schema: &Value) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (key, prop_schema) in properties {
        if !map.contains_key(key) {
            if let Some(default) = prop_schema.get("default") {
                map.insert(key.clone(), default.clone());
            } else if !required.contains(&key.as_str()) && allows_null(prop_schema) {
                map.insert(key.clone(), Value::Null);
            }
        }
        if let Some(child) = map.get_mut(key) {
            apply_defaults(child, prop_schema);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_schema() -> JsonSchemaSpec {
        JsonSchemaSpec::compile("entity", json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "type": "string" },
                "description": { "type": ["string", "null"] },
                "url": { "type": ["string", "null"], "format": HTTP_URL_FORMAT },
                "tags": { "type": "array", "items": { "type": "string" }, "default": [] }
            }
        })).unwrap()
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com/a?b=1"));
        assert!(is_http_url("http://localhost:8080"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url("www.example.com"));
    }

    #[test]
    fn test_parse_fills_defaults() {
        let parsed = entity_schema().parse(&json!({"title": "Widget"})).unwrap();
        assert_eq!(parsed, json!({"title": "Widget", "description": null, "url": null, "tags": []}));
    }

    #[test]
    fn test_parse_reports_each_violation() {
        let errors = entity_schema()
            .parse(&json!({"title": 5, "url": "not-a-url"}))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("/title")));
        assert!(errors.iter().any(|e| e.contains("/url")));
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(entity_schema().required_fields(), vec!["title".to_string()]);
    }

    #[test]
    fn test_defaults_recurse_into_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "extra": { "type": "object", "default": {} } }
                    }
                }
            }
        });
        let mut value = json!({"items": [{}, {"extra": {"a": 1}}]});
        apply_defaults(&mut value, &schema);
        assert_eq!(value, json!({"items": [{"extra": {}}, {"extra": {"a": 1}}]}));
    }
}
