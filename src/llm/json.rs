use serde_json::Value;

/// Parse a model reply as a JSON object, tolerating a Markdown code fence or
/// prose around the object.
pub fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value.is_object().then_some(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json(r#" {"a": 1} "#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_fenced_object() {
        let reply = "Here you go:\n```json\n{\"items\": []}\n```\nthanks";
        assert_eq!(extract_json(reply), Some(json!({"items": []})));
    }

    #[test]
    fn test_object_inside_prose() {
        assert_eq!(extract_json("result: {\"ok\": true} done"), Some(json!({"ok": true})));
    }

    #[test]
    fn test_rejects_non_objects_and_garbage() {
        assert_eq!(extract_json("[1, 2]"), None);
        assert_eq!(extract_json("not json at all"), None);
        assert_eq!(extract_json("{broken"), None);
    }
}
