use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::ScrapeError;
use crate::models::AttemptResult;
use crate::pipeline::origin::origin_of;
use super::Database;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub limit: usize,
    pub success: Option<bool>,
    /// Substring match on the stored domain.
    pub domain: Option<String>,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self { limit: DEFAULT_HISTORY_LIMIT, success: None, domain: None }
    }
}

const ATTEMPT_COLUMNS: &str = "id, url, domain, created_at, success, error_type, cost_usd, payload";

fn attempt_row(row: &rusqlite::Row) -> rusqlite::Result<Value> {
    let payload: String = row.get(7)?;
    Ok(json!({
        "id": row.get::<_, i64>(0)?,
        "url": row.get::<_, String>(1)?,
        "domain": row.get::<_, String>(2)?,
        "created_at": row.get::<_, String>(3)?,
        "success": row.get::<_, bool>(4)?,
        "error_type": row.get::<_, String>(5)?,
        "cost_usd": row.get::<_, f64>(6)?,
        "payload": serde_json::from_str::<Value>(&payload).unwrap_or(Value::String(payload)),
    }))
}

impl Database {
    /// Append one attempt, successful or not. Returns the record id.
    pub fn save_attempt(&self, result: &AttemptResult) -> Result<i64, ScrapeError> {
        let payload = serde_json::to_value(result)?;
        let url = result.metadata.url.as_str();
        let error_type = result.metadata.error_type.map(|k| k.as_str()).unwrap_or("none");

        let record_id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO scraping_results (url, domain, created_at, success, error_type, cost_usd, payload) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    url,
                    origin_of(url),
                    Utc::now().to_rfc3339(),
                    result.success,
                    error_type,
                    result.metadata.cost_usd,
                    payload.to_string(),
                ],
            ).map_err(|e| ScrapeError::Database(format!("Failed to save attempt: {}", e)))?;
            conn.last_insert_rowid()
        };

        if let Some(dir) = self.backup_dir() {
            if let Err(e) = write_backup(dir, record_id, &payload) {
                warn!(record_id, error = %e, "Failed to write attempt backup");
            }
        }
        Ok(record_id)
    }

    pub fn list_recent(&self, filter: &HistoryFilter) -> Result<Vec<Value>, ScrapeError> {
        let limit = filter.limit.clamp(1, MAX_HISTORY_LIMIT) as i64;
        let domain = filter.domain.as_deref()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scraping_results WHERE (?1 IS NULL OR success = ?1) AND (?2 IS NULL OR instr(domain, ?2) > 0) ORDER BY id DESC LIMIT ?3",
            ATTEMPT_COLUMNS
        )).map_err(|e| ScrapeError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![filter.success, domain, limit], attempt_row)
            .map_err(|e| ScrapeError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ScrapeError::Database(format!("Row error: {}", e)))?);
        }
        Ok(results)
    }

    pub fn get_attempt(&self, id: i64) -> Result<Option<Value>, ScrapeError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            &format!("SELECT {} FROM scraping_results WHERE id = ?1", ATTEMPT_COLUMNS),
            rusqlite::params![id],
            attempt_row,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ScrapeError::Database(format!("Query error: {}", e))),
        }
    }
}

fn write_backup(dir: &Path, record_id: i64, payload: &Value) -> Result<(), ScrapeError> {
    std::fs::create_dir_all(dir)?;
    let out = json!({
        "record_id": record_id,
        "saved_at": Utc::now().to_rfc3339(),
        "payload": payload,
    });
    std::fs::write(dir.join(format!("scrape_{}.json", record_id)), serde_json::to_string_pretty(&out)?)?;
    Ok(())
}
