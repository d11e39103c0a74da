use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use crate::errors::ScrapeError;

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
    backup_dir: Option<PathBuf>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, ScrapeError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ScrapeError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ScrapeError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)), backup_dir: None };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ScrapeError::Database(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ScrapeError::Database(format!("Failed to set pragmas: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)), backup_dir: None };
        db.initialize()?;
        Ok(db)
    }

    /// Directory receiving one `scrape_<id>.json` file per saved attempt.
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    fn initialize(&self) -> Result<(), ScrapeError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| ScrapeError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, ScrapeError> {
        self.conn.lock().map_err(|_| ScrapeError::Database("Connection lock poisoned".into()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone(), backup_dir: self.backup_dir.clone() }
    }
}
