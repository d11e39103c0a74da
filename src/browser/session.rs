use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

/// Per-host storage state on disk. Every operation is best effort.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: Option<PathBuf>,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    /// A store that never reads or writes.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(format!("{}.json", session_key(url))))
    }

    pub async fn load(&self, url: &str) -> Option<Value> {
        let path = self.path_for(url)?;
        if !path.exists() {
            return None;
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => {
                    info!(path = %path.display(), "Loaded saved session");
                    Some(state)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt session file");
                    None
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read session file");
                None
            }
        }
    }

    pub async fn save(&self, url: &str, state: &Value) {
        let Some(path) = self.path_for(url) else { return };
        if let Err(e) = write_state(&path, state).await {
            warn!(path = %path.display(), error = %e, "Could not save session");
        } else {
            debug!(path = %path.display(), "Session saved");
        }
    }
}

async fn write_state(path: &Path, state: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_vec(state)?).await
}

/// Host with a leading `www.` removed, safe as a file name.
pub fn session_key(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string());
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
