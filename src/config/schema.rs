use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "llm": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "provider": { "type": "string", "enum": ["openai", "openrouter", "local", "openai_compatible"] },
                    "model": { "type": "string", "minLength": 1 },
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string" },
                    "timeout_secs": { "type": "integer", "minimum": 1, "maximum": 600 }
                }
            },
            "browser": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "headless": { "type": "boolean" },
                    "timeout_ms": { "type": "integer", "minimum": 1000 },
                    "viewport_width": { "type": "integer", "minimum": 320 },
                    "viewport_height": { "type": "integer", "minimum": 240 },
                    "node_binary": { "type": "string", "minLength": 1 },
                    "stealth": { "type": "boolean" }
                }
            },
            "scraping": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "max_concurrent_tasks": { "type": "integer", "minimum": 1 },
                    "retry_attempts": { "type": "integer", "minimum": 1, "maximum": 10 },
                    "retry_delay": { "type": "number", "minimum": 0 }
                }
            },
            "storage": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "database": { "type": "string" },
                    "exports_dir": { "type": "string" },
                    "sessions_dir": { "type": "string" }
                }
            }
        }
    })
});
