use std::sync::Arc;
use std::time::Instant;

use crate::affect::journal::FeedbackJournal;
use crate::affect::persistence::JsonFileStore;
use crate::affect::{AffectEngine, ConfigError, EngineConfig};
use crate::config::Config;

/// Composition root: builds the engine once and hands out shared handles.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    engine: Arc<AffectEngine>,
}

impl AppState {
    pub fn new(engine: Arc<AffectEngine>) -> Self {
        Self {
            started_at: Instant::now(),
            engine,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(Self::create_engine(config)?))
    }

    pub fn create_engine(config: &Config) -> Result<Arc<AffectEngine>, ConfigError> {
        let engine_config = match config.engine_config {
            Some(ref path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        }
        .apply_env();

        let store = Arc::new(JsonFileStore::new(&config.data_dir));
        let mut engine = AffectEngine::new(engine_config, store)?;
        if config.feedback_journal {
            engine = engine.with_journal(FeedbackJournal::in_dir(&config.data_dir));
        }
        Ok(Arc::new(engine))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn engine(&self) -> Arc<AffectEngine> {
        Arc::clone(&self.engine)
    }
}
