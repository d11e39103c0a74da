use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::agent::AgentLoop;
use crate::browser::{CaptureEngine, PageOptions, PlaywrightEngine, RenderEngine, SessionStore};
use crate::config::Settings;
use crate::db::Database;
use crate::errors::ScrapeError;
use crate::llm::{ExtractionClient, HttpProviderFactory, ProviderFactory};
use crate::pipeline::{ScrapeMetrics, ScrapeOrchestrator};

/// The long-lived components shared by the CLI commands and the HTTP server.
#[derive(Clone)]
pub struct Runtime {
    pub settings: Arc<Settings>,
    pub db: Database,
    pub extractor: Arc<ExtractionClient>,
    pub orchestrator: Arc<ScrapeOrchestrator>,
    pub metrics: Arc<ScrapeMetrics>,
    pub agent: Arc<AgentLoop>,
}

impl Runtime {
    /// Production wiring: Playwright bridge, HTTP model provider, SQLite on disk.
    pub fn from_settings(settings: Settings) -> Result<Self, ScrapeError> {
        let engine: Arc<dyn RenderEngine> = Arc::new(PlaywrightEngine::new(&settings.browser));
        let factory: Arc<dyn ProviderFactory> = Arc::new(HttpProviderFactory::new(
            &settings.llm.provider,
            settings.llm.base_url.as_deref(),
            Duration::from_secs(settings.llm.timeout_secs),
        )?);
        let db = Database::new(&settings.storage.database.to_string_lossy())?
            .with_backup_dir(settings.storage.exports_dir.clone());
        info!(
            provider = %settings.llm.provider,
            model = %settings.llm.model,
            database = %settings.storage.database.display(),
            "Runtime initialised"
        );
        let sessions = SessionStore::new(settings.storage.sessions_dir.clone());
        Self::with_components(settings, engine, factory, db, sessions)
    }

    pub fn with_components(
        settings: Settings,
        engine: Arc<dyn RenderEngine>,
        factory: Arc<dyn ProviderFactory>,
        db: Database,
        sessions: SessionStore,
    ) -> Result<Self, ScrapeError> {
        let page_defaults = PageOptions {
            viewport_width: settings.browser.viewport_width,
            viewport_height: settings.browser.viewport_height,
            stealth: settings.browser.stealth,
            ..PageOptions::default()
        };

        let extractor = Arc::new(
            ExtractionClient::new(
                factory,
                &settings.llm.provider,
                settings.llm.api_key.as_deref(),
                &settings.llm.model,
            )
            .with_timeout(Duration::from_secs(settings.llm.timeout_secs)),
        );

        let metrics = Arc::new(ScrapeMetrics::new()?);
        let capture = Arc::new(CaptureEngine::new(engine.clone(), sessions, page_defaults.clone()));
        let orchestrator = Arc::new(
            ScrapeOrchestrator::new(
                capture,
                extractor.clone(),
                settings.scraping.retry_config(),
                settings.scraping.origin_limit(),
            )
            .with_storage(db.clone())
            .with_metrics(metrics.clone()),
        );
        let agent = Arc::new(
            AgentLoop::new(engine, page_defaults, extractor.clone())
                .with_storage(db.clone())
                .with_timeout_ms(settings.browser.timeout_ms),
        );

        Ok(Self {
            settings: Arc::new(settings),
            db,
            extractor,
            orchestrator,
            metrics,
            agent,
        })
    }
}
