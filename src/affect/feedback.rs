use std::sync::Arc;

use crate::affect::decision::BanditEngine;
use crate::affect::error::EngineError;
use crate::affect::types::{EmotionState, Reward, ValueUpdate};

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedFeedback {
    pub category: String,
    pub update: ValueUpdate,
}

/// Routes feedback to the engine whose action set contains the action.
/// Action sets are disjoint (checked at configuration time), so the first
/// match in configuration order is the only one.
pub struct FeedbackRouter {
    engines: Vec<Arc<BanditEngine>>,
}

impl FeedbackRouter {
    pub fn new(engines: Vec<Arc<BanditEngine>>) -> Self {
        Self { engines }
    }

    pub fn resolve(&self, action: &str) -> Option<&Arc<BanditEngine>> {
        self.engines.iter().find(|engine| engine.contains(action))
    }

    pub fn apply(
        &self,
        state: &EmotionState,
        action: &str,
        reward: Reward,
    ) -> Result<RoutedFeedback, EngineError> {
        let Some(engine) = self.resolve(action) else {
            tracing::warn!(%state, action, "feedback rejected: action not in any known category");
            return Err(EngineError::UnknownAction(action.to_string()));
        };

        let update = engine.update(state, action, reward)?;
        Ok(RoutedFeedback {
            category: engine.name().to_string(),
            update,
        })
    }
}
