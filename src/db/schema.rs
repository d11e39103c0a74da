pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS scraping_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    domain TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    success INTEGER NOT NULL DEFAULT 0,
    error_type TEXT NOT NULL DEFAULT 'unknown',
    cost_usd REAL NOT NULL DEFAULT 0.0,
    payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_executions (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    goal TEXT NOT NULL,
    schema_name TEXT NOT NULL,
    success INTEGER NOT NULL DEFAULT 0,
    stop_reason TEXT,
    tokens_used INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0.0,
    duration_seconds REAL NOT NULL DEFAULT 0.0,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    execution_id TEXT NOT NULL REFERENCES agent_executions(id) ON DELETE CASCADE,
    step_index INTEGER NOT NULL,
    action TEXT NOT NULL,
    success INTEGER NOT NULL DEFAULT 0,
    current_url TEXT NOT NULL,
    error TEXT,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scraping_results_url ON scraping_results(url);
CREATE INDEX IF NOT EXISTS idx_scraping_results_created_at ON scraping_results(created_at);
CREATE INDEX IF NOT EXISTS idx_scraping_results_success ON scraping_results(success);
CREATE INDEX IF NOT EXISTS idx_agent_steps_execution ON agent_steps(execution_id, step_index);
";
