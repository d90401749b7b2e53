use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::affect::config::EngineConfig;
use crate::affect::decision::{BanditEngine, CategoricalRules, OverrideRuleSet};
use crate::affect::error::{ConfigError, EngineError};
use crate::affect::feedback::FeedbackRouter;
use crate::affect::journal::FeedbackJournal;
use crate::affect::orchestrator::RecommendationOrchestrator;
use crate::affect::persistence::{PersistentTable, TableStore};
use crate::affect::types::{
    ActionValues, EmotionState, FeedbackAck, FeedbackRecord, Features, Recommendation, Reward,
    ValueTable,
};

/// Entry point for the request handlers: one instance per process, shared
/// behind an `Arc`.
pub struct AffectEngine {
    config: EngineConfig,
    engines: Vec<Arc<BanditEngine>>,
    orchestrator: RecommendationOrchestrator,
    router: FeedbackRouter,
    journal: Option<FeedbackJournal>,
}

impl AffectEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn TableStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let engines = config
            .categories
            .iter()
            .enumerate()
            .map(|(idx, category)| {
                let storage = PersistentTable::new(category.name.clone(), Arc::clone(&store));
                let rng = seeded(config.seed, idx as u64);
                BanditEngine::new(category.clone(), storage, rng).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rules = CategoricalRules::new(
            config.rules.clone(),
            seeded(config.seed, engines.len() as u64),
        );
        let orchestrator = RecommendationOrchestrator::new(
            OverrideRuleSet::new(&config.overrides),
            rules,
            engines.clone(),
        );
        let router = FeedbackRouter::new(engines.clone());

        tracing::info!(
            categories = ?config.category_names(),
            seeded = config.seed.is_some(),
            "affect engine initialized"
        );

        Ok(Self {
            config,
            engines,
            orchestrator,
            router,
            journal: None,
        })
    }

    pub fn with_journal(mut self, journal: FeedbackJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn categories(&self) -> Vec<&str> {
        self.config.category_names()
    }

    pub fn engine(&self, category: &str) -> Option<&Arc<BanditEngine>> {
        self.engines.iter().find(|e| e.name() == category)
    }

    pub fn recommend(&self, state: &str, features: Option<&Features>) -> Result<Recommendation, EngineError> {
        let state = EmotionState::parse(state)?;
        Ok(self.orchestrator.recommend(&state, features))
    }

    pub fn submit_feedback(&self, state: &str, action: &str, reward: f64) -> Result<FeedbackAck, EngineError> {
        self.submit_session_feedback(None, state, action, reward)
    }

    /// Validates everything before touching a table, routes the update,
    /// then records the event in the journal when one is attached.
    pub fn submit_session_feedback(
        &self,
        session_id: Option<&str>,
        state: &str,
        action: &str,
        reward: f64,
    ) -> Result<FeedbackAck, EngineError> {
        let state = EmotionState::parse(state)?;
        let reward = Reward::new(reward)?;
        let routed = self.router.apply(&state, action, reward)?;

        if let Some(ref journal) = self.journal {
            let record = FeedbackRecord {
                id: uuid::Uuid::new_v4().to_string(),
                session_id: session_id.map(str::to_string),
                state: state.as_str().to_string(),
                action: action.to_string(),
                category: routed.category.clone(),
                reward: reward.value(),
                recorded_at: Utc::now(),
            };
            if let Err(err) = journal.append(&record) {
                tracing::warn!(error = %err, path = %journal.path().display(), "failed to journal feedback");
            }
        }

        Ok(FeedbackAck {
            category: routed.category,
            state: state.as_str().to_string(),
            action: action.to_string(),
            previous_value: routed.update.previous,
            value: routed.update.value,
        })
    }

    /// Current estimates for a learned category; unseen states read as zero
    /// and are not materialized.
    pub fn estimates(&self, category: &str, state: &str) -> Result<ActionValues, EngineError> {
        let state = EmotionState::parse(state)?;
        let engine = self
            .engine(category)
            .ok_or_else(|| EngineError::UnknownCategory(category.to_string()))?;
        Ok(engine.state_values(&state))
    }

    pub fn snapshot(&self, category: &str) -> Result<ValueTable, EngineError> {
        self.engine(category)
            .map(|engine| engine.snapshot())
            .ok_or_else(|| EngineError::UnknownCategory(category.to_string()))
    }

    pub fn journal(&self) -> Option<&FeedbackJournal> {
        self.journal.as_ref()
    }
}

fn seeded(base: Option<u64>, offset: u64) -> StdRng {
    match base {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
        None => StdRng::from_os_rng(),
    }
}
