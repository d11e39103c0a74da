use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde_json::{json, Value};
use tracing::error;

use super::{ExtractionSchema, JsonSchemaSpec, HTTP_URL_FORMAT};

pub const DEFAULT_SCHEMA: &str = "generic_list";

fn nullable(kind: &str) -> Value {
    json!({ "type": [kind, "null"] })
}

fn http_url() -> Value {
    json!({ "type": "string", "format": HTTP_URL_FORMAT })
}

fn product() -> Value {
    json!({
        "type": "object",
        "required": ["name", "price", "url"],
        "properties": {
            "name": { "type": "string" },
            "price": { "type": "number", "exclusiveMinimum": 0 },
            "original_price": { "type": ["number", "null"], "exclusiveMinimum": 0 },
            "discount_percentage": { "type": ["number", "null"], "minimum": 0, "maximum": 100 },
            "description": nullable("string"),
            "brand": nullable("string"),
            "category": nullable("string"),
            "available": { "type": "boolean", "default": true },
            "stock_quantity": { "type": ["integer", "null"], "minimum": 0 },
            "images": { "type": "array", "items": http_url(), "default": [] },
            "specifications": {
                "type": "array",
                "default": [],
                "items": {
                    "type": "object",
                    "required": ["key", "value"],
                    "properties": {
                        "key": { "type": "string" },
                        "value": { "type": "string" }
                    }
                }
            },
            "reviews": {
                "type": ["object", "null"],
                "required": ["rating", "total_reviews"],
                "properties": {
                    "rating": { "type": "number", "minimum": 0, "maximum": 5 },
                    "total_reviews": { "type": "integer", "minimum": 0 }
                }
            },
            "url": http_url()
        }
    })
}

fn product_list() -> Value {
    json!({
        "title": "ProductListPage",
        "type": "object",
        "required": ["products", "total_count"],
        "properties": {
            "products": { "type": "array", "items": product() },
            "total_count": { "type": "integer", "minimum": 0 },
            "page": { "type": "integer", "minimum": 1, "default": 1 },
            "has_next_page": { "type": "boolean", "default": false }
        }
    })
}

fn article() -> Value {
    json!({
        "title": "Article",
        "type": "object",
        "required": ["title", "content", "url"],
        "properties": {
            "title": { "type": "string" },
            "subtitle": nullable("string"),
            "author": nullable("string"),
            "published_at": nullable("string"),
            "content": { "type": "string" },
            "categories": { "type": "array", "items": { "type": "string" }, "default": [] },
            "tags": { "type": "array", "items": { "type": "string" }, "default": [] },
            "images": {
                "type": "array",
                "default": [],
                "items": {
                    "type": "object",
                    "required": ["url"],
                    "properties": {
                        "url": http_url(),
                        "caption": nullable("string")
                    }
                }
            },
            "related_links": { "type": "array", "items": http_url(), "default": [] },
            "url": http_url()
        }
    })
}

fn generic_entity() -> Value {
    json!({
        "type": "object",
        "required": ["title"],
        "properties": {
            "title": { "type": "string" },
            "description": nullable("string"),
            "url": { "type": ["string", "null"], "format": HTTP_URL_FORMAT },
            "extra": { "type": "object", "default": {} }
        }
    })
}

fn generic_list() -> Value {
    json!({
        "title": "GenericListPage",
        "type": "object",
        "required": [],
        "properties": {
            "items": { "type": "array", "items": generic_entity(), "default": [] },
            "total_count": { "type": "integer", "default": 0 }
        }
    })
}

fn guided_extract() -> Value {
    json!({
        "title": "GuidedExtractionResult",
        "type": "object",
        "required": ["objective"],
        "properties": {
            "objective": { "type": "string" },
            "summary": nullable("string"),
            "findings": { "type": "array", "items": generic_entity(), "default": [] },
            "total_count": { "type": "integer", "default": 0 }
        }
    })
}

static CATALOG: LazyLock<HashMap<&'static str, Arc<dyn ExtractionSchema>>> = LazyLock::new(|| {
    let mut catalog: HashMap<&'static str, Arc<dyn ExtractionSchema>> = HashMap::new();
    let entries: [(&'static str, Value); 4] = [
        ("product_list", product_list()),
        ("article", article()),
        ("generic_list", generic_list()),
        ("guided_extract", guided_extract()),
    ];
    for (name, document) in entries {
        match JsonSchemaSpec::compile(name, document) {
            Ok(spec) => {
                catalog.insert(name, Arc::new(spec));
            }
            Err(e) => error!(schema = name, error = %e, "Built-in schema failed to compile"),
        }
    }
    catalog
});

/// Built-in schema by name.
pub fn lookup(name: &str) -> Option<Arc<dyn ExtractionSchema>> {
    CATALOG.get(name.trim()).cloned()
}

pub fn schema_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = CATALOG.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_compile() {
        assert_eq!(schema_names(), vec!["article", "generic_list", "guided_extract", "product_list"]);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("recipes").is_none());
        assert!(lookup(DEFAULT_SCHEMA).is_some());
    }

    #[test]
    fn test_product_list_accepts_minimal_page() {
        let schema = lookup("product_list").unwrap();
        let parsed = schema.parse(&json!({
            "products": [{ "name": "Lamp", "price": 19.9, "url": "https://shop.example/lamp" }],
            "total_count": 1
        })).unwrap();
        assert_eq!(parsed["page"], 1);
        assert_eq!(parsed["has_next_page"], false);
        assert_eq!(parsed["products"][0]["available"], true);
        assert_eq!(parsed["products"][0]["images"], json!([]));
        assert!(parsed["products"][0]["reviews"].is_null());
    }

    #[test]
    fn test_product_price_must_be_positive() {
        let schema = lookup("product_list").unwrap();
        let errors = schema.parse(&json!({
            "products": [{ "name": "Lamp", "price": 0, "url": "https://shop.example/lamp" }],
            "total_count": 1
        })).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_article_requires_absolute_url() {
        let schema = lookup("article").unwrap();
        let result = schema.parse(&json!({ "title": "T", "content": "C", "url": "/news/1" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_guided_extract_required_fields() {
        let schema = lookup("guided_extract").unwrap();
        assert_eq!(schema.required_fields(), vec!["objective".to_string()]);
        assert!(schema.parse(&json!({ "summary": "x" })).is_err());
    }

    #[test]
    fn test_generic_list_accepts_empty_object() {
        let schema = lookup("generic_list").unwrap();
        let parsed = schema.parse(&json!({})).unwrap();
        assert_eq!(parsed, json!({ "items": [], "total_count": 0 }));
        assert!(schema.required_fields().is_empty());
    }
}
