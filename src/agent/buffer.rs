use std::collections::HashSet;

use serde_json::Value;

use crate::models::AgentState;

/// Evidence gathered across agent steps, plus the records extracted from it.
#[derive(Debug, Default)]
pub struct ExtractionBuffer {
    states: Vec<AgentState>,
    items: Vec<Value>,
    keys: HashSet<String>,
}

impl ExtractionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, state: AgentState) {
        self.states.push(state);
    }

    pub fn states(&self) -> &[AgentState] {
        &self.states
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Keeps items whose semantic key was not seen yet. Items with no name,
    /// address or phone have nothing to compare by and are always kept.
    /// Returns how many were added.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = Value>) -> usize {
        let before = self.items.len();
        for item in items {
            let key = semantic_key(&item);
            if key == EMPTY_KEY || self.keys.insert(key) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    fn into_items(self) -> Vec<Value> {
        self.items
    }
}

/// Drop repeated records within each top-level list of objects in `data`.
/// Each list is deduplicated on its own.
pub fn dedup_records(data: &mut Value) -> usize {
    let Some(fields) = data.as_object_mut() else {
        return 0;
    };
    let mut dropped = 0;
    for list in fields.values_mut() {
        let Some(entries) = list.as_array_mut() else {
            continue;
        };
        if entries.is_empty() || !entries.iter().all(Value::is_object) {
            continue;
        }
        let before = entries.len();
        let mut seen = ExtractionBuffer::new();
        seen.add_items(entries.drain(..));
        *entries = seen.into_items();
        dropped += before - entries.len();
    }
    dropped
}

const EMPTY_KEY: &str = "||";

/// `name|address|phone`, trimmed and lower-cased.
pub fn semantic_key(item: &Value) -> String {
    let name = first_present(item, &["title", "name"]);
    let address = first_present(item, &["address", "location"]);
    let phone = first_present(item, &["phone"]);
    format!("{}|{}|{}", name, address, phone)
}

fn first_present(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .map(|v| match v {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
