use chrono::Utc;
use serde_json::{json, Value};

use crate::errors::ScrapeError;
use crate::models::{AgentExecutionResponse, AgentStepResult};
use super::Database;

/// What the agent was asked to do, stored next to its outcome.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub url: &'a str,
    pub goal: &'a str,
    pub schema_name: &'a str,
}

impl Database {
    pub fn save_agent_execution(
        &self,
        request: ExecutionRequest<'_>,
        response: &AgentExecutionResponse,
    ) -> Result<(), ScrapeError> {
        let payload = serde_json::to_string(response)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO agent_executions (id, url, goal, schema_name, success, stop_reason, tokens_used, cost_usd, duration_seconds, payload, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                response.execution_id,
                request.url,
                request.goal,
                request.schema_name,
                response.success,
                response.metadata.stop.reason,
                response.metadata.tokens_used as i64,
                response.metadata.cost_usd,
                response.metadata.duration_seconds,
                payload,
                Utc::now().to_rfc3339(),
            ],
        ).map_err(|e| ScrapeError::Database(format!("Failed to save agent execution: {}", e)))?;
        Ok(())
    }

    pub fn save_agent_steps(&self, execution_id: &str, steps: &[AgentStepResult]) -> Result<(), ScrapeError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| ScrapeError::Database(format!("Failed to open transaction: {}", e)))?;
        let now = Utc::now().to_rfc3339();
        for step in steps {
            let action = serde_json::to_value(step.action.action)?;
            tx.execute(
                "INSERT INTO agent_steps (execution_id, step_index, action, success, current_url, error, payload, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    execution_id,
                    step.step_index,
                    action.as_str().unwrap_or_default(),
                    step.success,
                    step.current_url,
                    step.error,
                    serde_json::to_string(step)?,
                    now,
                ],
            ).map_err(|e| ScrapeError::Database(format!("Failed to save agent step: {}", e)))?;
        }
        tx.commit()
            .map_err(|e| ScrapeError::Database(format!("Failed to commit agent steps: {}", e)))?;
        Ok(())
    }

    /// Steps of one execution, in step order.
    pub fn get_execution_steps(&self, execution_id: &str) -> Result<Vec<AgentStepResult>, ScrapeError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM agent_steps WHERE execution_id = ?1 ORDER BY step_index ASC, id ASC"
        ).map_err(|e| ScrapeError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![execution_id], |row| row.get::<_, String>(0))
            .map_err(|e| ScrapeError::Database(format!("Query error: {}", e)))?;

        let mut steps = Vec::new();
        for row in rows {
            let payload = row.map_err(|e| ScrapeError::Database(format!("Row error: {}", e)))?;
            steps.push(serde_json::from_str(&payload)?);
        }
        Ok(steps)
    }

    pub fn get_agent_execution(&self, execution_id: &str) -> Result<Option<Value>, ScrapeError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT id, url, goal, schema_name, success, stop_reason, payload, created_at FROM agent_executions WHERE id = ?1",
            rusqlite::params![execution_id],
            |row| {
                let payload: String = row.get(6)?;
                Ok(json!({
                    "id": row.get::<_, String>(0)?,
                    "url": row.get::<_, String>(1)?,
                    "goal": row.get::<_, String>(2)?,
                    "schema": row.get::<_, String>(3)?,
                    "success": row.get::<_, bool>(4)?,
                    "stop_reason": row.get::<_, Option<String>>(5)?,
                    "payload": serde_json::from_str::<Value>(&payload).unwrap_or(Value::Null),
                    "created_at": row.get::<_, String>(7)?,
                }))
            },
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ScrapeError::Database(format!("Query error: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionKind, AgentAction, AgentExecutionMetadata, StateSnapshot, StopReason};

    fn step(index: u32, action: ActionKind) -> AgentStepResult {
        AgentStepResult {
            step_index: index,
            action: AgentAction::new(action),
            success: true,
            current_url: format!("https://a.example/{}", index),
            title: "A".into(),
            error: None,
            elapsed_seconds: 0.1,
            state_snapshot: StateSnapshot { url: format!("https://a.example/{}", index), title: "A".into(), last_error: None },
        }
    }

    #[test]
    fn test_execution_and_steps_round_trip() {
        let db = Database::in_memory().unwrap();
        let steps = vec![step(1, ActionKind::Click), step(2, ActionKind::Scroll)];
        let response = AgentExecutionResponse {
            execution_id: "exec-1".into(),
            success: true,
            data: Some(json!({"items": []})),
            metadata: AgentExecutionMetadata { stop: StopReason::MaxStepsReached.condition(), ..Default::default() },
            steps: steps.clone(),
        };
        let request = ExecutionRequest { url: "https://a.example", goal: "list shops", schema_name: "guided_extract" };

        db.save_agent_execution(request, &response).unwrap();
        db.save_agent_steps("exec-1", &response.steps).unwrap();

        assert_eq!(db.get_execution_steps("exec-1").unwrap(), steps);
        assert!(db.get_execution_steps("missing").unwrap().is_empty());
        let row = db.get_agent_execution("exec-1").unwrap().unwrap();
        assert_eq!(row["stop_reason"], "max_steps_reached");
        assert_eq!(row["schema"], "guided_extract");
    }

    #[test]
    fn test_steps_require_execution() {
        let db = Database::in_memory().unwrap();
        assert!(db.save_agent_steps("ghost", &[step(1, ActionKind::Wait)]).is_err());
    }
}
