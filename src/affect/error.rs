use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state label must not be empty")]
    InvalidState,

    #[error("reward {0} is outside the accepted range [-1, 1]")]
    InvalidReward(f64),

    #[error("action '{0}' not in any known category")]
    UnknownAction(String),

    #[error("action '{action}' does not belong to category '{category}'")]
    ActionNotInCategory { category: String, action: String },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// The in-memory estimate changed but the table could not be written.
    /// Feedback may be lost on crash.
    #[error("feedback applied in memory but not persisted: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read engine config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no learned categories configured")]
    NoCategories,

    #[error("invalid category name '{0}' (expected lowercase letters, digits, '_' or '-')")]
    InvalidCategoryName(String),

    #[error("category '{0}' is configured more than once")]
    DuplicateCategory(String),

    #[error("category '{category}' needs at least 2 actions, got {count}")]
    TooFewActions { category: String, count: usize },

    #[error("action '{action}' is claimed by both '{first}' and '{second}'")]
    OverlappingAction {
        action: String,
        first: String,
        second: String,
    },

    #[error("category '{category}': learning rate {value} must be in (0, 1]")]
    LearningRate { category: String, value: f64 },

    #[error("category '{category}': exploration rate {value} must be in [0, 1]")]
    ExplorationRate { category: String, value: f64 },

    #[error("rule category '{0}' has no fallback options")]
    MissingFallback(String),

    #[error("rule option '{option}' in '{category}' collides with a learned action")]
    RuleOptionCollision { category: String, option: String },

    #[error("override '{rule}' targets unknown category '{category}'")]
    UnknownOverrideCategory { rule: String, category: String },

    #[error("override '{rule}' value '{value}' is not an action of '{category}'")]
    OverrideValueNotInCategory {
        rule: String,
        category: String,
        value: String,
    },

    #[error("override '{rule}' threshold {value} must be finite")]
    Threshold { rule: String, value: f64 },
}
