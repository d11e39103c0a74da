use serde_json::{Map, Number, Value};

use crate::schema::{allows_null, allows_type, HTTP_URL_FORMAT};

/// Repair near-miss model output so it has a chance to pass a second strict
/// parse. Driven by the schema: only fields whose declared type differs from
/// the value are touched.
pub fn coerce(value: &Value, schema: &Value) -> Value {
    if is_url_field(schema) {
        if let Value::String(s) = value {
            return normalize_url(s).map(Value::String).unwrap_or(Value::Null);
        }
    }

    match value {
        Value::Object(map) => coerce_object(map, schema),
        Value::Array(items) => coerce_array(items, schema),
        Value::Number(_) | Value::Bool(_) if wants_string_only(schema) => Value::String(scalar_text(value)),
        Value::String(s) => coerce_string(s, schema).unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn coerce_object(map: &Map<String, Value>, schema: &Value) -> Value {
    match schema.get("properties").and_then(Value::as_object) {
        Some(properties) => {
            let mut out = map.clone();
            for (key, prop_schema) in properties {
                if let Some(child) = map.get(key) {
                    out.insert(key.clone(), coerce(child, prop_schema));
                }
            }
            Value::Object(out)
        }
        // Free-form maps (e.g. `extra`) keep scalars and flatten everything else to text.
        None if allows_type(schema, "object") => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let flat = match v {
                        Value::Array(_) | Value::Object(_) => Value::String(v.to_string()),
                        scalar => scalar.clone(),
                    };
                    (k.clone(), flat)
                })
                .collect(),
        ),
        None => Value::Object(map.clone()),
    }
}

fn coerce_array(items: &[Value], schema: &Value) -> Value {
    let Some(item_schema) = schema.get("items") else {
        return Value::Array(items.to_vec());
    };
    let url_items = is_url_field(item_schema) && !allows_null(item_schema);
    Value::Array(
        items.iter()
            .map(|item| coerce(item, item_schema))
            // A URL list cannot hold nulls; drop entries that could not be repaired.
            .filter(|item| !(url_items && item.is_null()))
            .collect(),
    )
}

fn coerce_string(s: &str, schema: &Value) -> Option<Value> {
    if allows_type(schema, "string") {
        return None;
    }
    let trimmed = s.trim();
    if allows_type(schema, "integer") {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Value::Number(n.into()));
        }
    }
    if allows_type(schema, "number") {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Some(Value::Number(n));
        }
    }
    if allows_type(schema, "boolean") {
        match trimmed.to_lowercase().as_str() {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }
    }
    None
}

fn wants_string_only(schema: &Value) -> bool {
    allows_type(schema, "string") && !allows_type(schema, "number") && !allows_type(schema, "integer")
        && !allows_type(schema, "boolean")
}

fn is_url_field(schema: &Value) -> bool {
    schema.get("format").and_then(Value::as_str) == Some(HTTP_URL_FORMAT)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Absolute http(s) URLs pass through, `www.` hosts gain a scheme, anything
/// else (blank, placeholders, relative paths) becomes absent.
pub fn normalize_url(raw: &str) -> Option<String> {
    let value = raw.trim();
    let lowered = value.to_lowercase();
    if value.is_empty() || lowered == "n/a" || lowered == "none" {
        return None;
    }
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Some(value.to_string());
    }
    if lowered.starts_with("www.") {
        return Some(format!("https://{}", value));
    }
    None
}
