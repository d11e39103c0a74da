pub mod agent;
pub mod commands;
pub mod history;
pub mod scrape;
pub mod serve;
pub mod validate;

pub use commands::{Cli, Commands};

use std::path::PathBuf;

use crate::config::{self, Settings};
use crate::errors::{ErrorKind, ScrapeError};

/// Settings for a command: defaults, then the `--config` file, then environment.
pub async fn settings_for(config_path: Option<&str>) -> Result<Settings, ScrapeError> {
    let path = config_path.map(PathBuf::from);
    config::load_settings(path.as_deref()).await
}

/// Rebuild an error from a reported failure kind so the exit code reflects it.
pub(crate) fn failure(kind: Option<ErrorKind>, message: String) -> ScrapeError {
    match kind {
        Some(ErrorKind::Validation) => ScrapeError::Validation(message),
        Some(ErrorKind::Blocked) => ScrapeError::Blocked(message),
        Some(ErrorKind::Model) => ScrapeError::Model(message),
        Some(ErrorKind::Network) => ScrapeError::Network(message),
        Some(ErrorKind::Unknown) | None => ScrapeError::Internal(message),
    }
}
