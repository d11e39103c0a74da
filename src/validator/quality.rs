use serde_json::Value;

use crate::models::QualityReport;

const FLAG_PENALTY: f64 = 0.08;
const MAX_PENALTY: f64 = 0.45;

/// Absent, blank string, or empty collection.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// `invalid_url:<path>` for every non-empty string under a key mentioning
/// `url` or `link` that is not an absolute http(s) URL.
pub fn collect_url_flags(value: &Value) -> Vec<String> {
    let mut flags = Vec::new();
    walk(value, String::new(), &mut flags);
    flags
}

fn walk(value: &Value, path: String, flags: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let subpath = if path.is_empty() { key.clone() } else { format!("{}.{}", path, key) };
                let lowered = key.to_lowercase();
                if lowered.contains("url") || lowered.contains("link") {
                    if let Value::String(s) = child {
                        if !s.is_empty() && !s.starts_with("http://") && !s.starts_with("https://") {
                            flags.push(format!("invalid_url:{}", subpath));
                        }
                    }
                }
                walk(child, subpath, flags);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                walk(child, format!("{}[{}]", path, idx), flags);
            }
        }
        _ => {}
    }
}

pub fn assess_quality(data: &Value, required: &[String]) -> QualityReport {
    let mut flags = Vec::new();
    let mut present = 0;
    for field in required {
        if is_empty(data.get(field)) {
            flags.push(format!("missing_required:{}", field));
        } else {
            present += 1;
        }
    }
    let required_total = required.len().max(1);
    let completeness = present as f64 / required_total as f64;

    flags.extend(collect_url_flags(data));
    let penalty = (flags.len() as f64 * FLAG_PENALTY).min(MAX_PENALTY);
    let score = (((completeness - penalty) * 1000.0).round() / 1000.0).max(0.0);

    QualityReport {
        score,
        flags,
        required_total,
        required_present: present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&json!(null))));
        assert!(is_empty(Some(&json!("   "))));
        assert!(is_empty(Some(&json!([]))));
        assert!(is_empty(Some(&json!({}))));
        assert!(!is_empty(Some(&json!(0))));
        assert!(!is_empty(Some(&json!(false))));
    }

    #[test]
    fn test_url_flags_paths() {
        let data = json!({
            "items": [
                { "url": "https://ok.example", "extra": { "website_link": "shop.example" } },
                { "url": "/relative" }
            ],
            "source_url": ""
        });
        let mut flags = collect_url_flags(&data);
        flags.sort();
        assert_eq!(flags, vec![
            "invalid_url:items[0].extra.website_link".to_string(),
            "invalid_url:items[1].url".to_string(),
        ]);
    }

    #[test]
    fn test_complete_record_scores_one() {
        let report = assess_quality(&json!({"objective": "x"}), &fields(&["objective"]));
        assert_eq!(report.score, 1.0);
        assert!(report.flags.is_empty());
        assert_eq!((report.required_total, report.required_present), (1, 1));
    }

    #[test]
    fn test_missing_required_penalized() {
        let report = assess_quality(&json!({"title": "T", "content": " "}), &fields(&["title", "content"]));
        assert_eq!(report.flags, vec!["missing_required:content"]);
        assert_eq!(report.score, 0.42);
    }

    #[test]
    fn test_penalty_capped() {
        let items: Vec<Value> = (0..10).map(|_| json!({"url": "nope"})).collect();
        let report = assess_quality(&json!({"items": items}), &[]);
        assert_eq!(report.required_total, 1);
        assert_eq!(report.flags.len(), 10);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_no_required_fields_counts_as_zero_completeness() {
        let report = assess_quality(&json!({"items": []}), &[]);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.required_present, 0);
    }
}
