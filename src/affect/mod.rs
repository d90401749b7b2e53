pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod journal;
pub mod orchestrator;
pub mod persistence;
pub mod types;

pub use config::EngineConfig;
pub use engine::AffectEngine;
pub use error::{ConfigError, EngineError, PersistenceError};
pub use types::*;
