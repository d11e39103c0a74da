use std::path::PathBuf;

use tracing::info;

use crate::api::{self, AppState};
use crate::cli::commands::ServeArgs;
use crate::config::Settings;
use crate::errors::ScrapeError;
use crate::runtime::Runtime;

pub async fn handle_serve(args: ServeArgs, mut settings: Settings) -> Result<(), ScrapeError> {
    if let Some(db) = &args.db {
        settings.storage.database = PathBuf::from(db);
    }
    let runtime = Runtime::from_settings(settings)?;
    let app = api::build_router(AppState::new(runtime));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScrapeError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
