//! Epsilon-greedy contextual bandit over one category's fixed action set.
//!
//! - Context is the normalized emotion label; every state keeps its own
//!   estimate per action
//! - Exploration picks uniformly from the full action set
//! - Exploitation picks uniformly among all actions tied at the maximum
//! - Updates are single-step: `Q <- Q + alpha * (reward - Q)`
//!
//! Table, random source and persistence share one lock, so lazy state
//! initialization, the read-modify-write of an update and the durable
//! write never interleave between callers.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::affect::config::CategoryConfig;
use crate::affect::error::{ConfigError, EngineError};
use crate::affect::persistence::PersistentTable;
use crate::affect::types::{ActionValues, EmotionState, Reward, ValueTable, ValueUpdate};

struct BanditInner {
    table: ValueTable,
    rng: StdRng,
}

pub struct BanditEngine {
    config: CategoryConfig,
    storage: PersistentTable,
    inner: Mutex<BanditInner>,
}

impl BanditEngine {
    /// Rejects configs a bandit cannot run on (fewer than two actions,
    /// duplicate actions, rates out of range) before touching storage.
    pub fn new(config: CategoryConfig, storage: PersistentTable, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = storage.load(&config.actions);
        tracing::info!(
            category = %config.name,
            actions = config.actions.len(),
            states = table.len(),
            epsilon = config.epsilon,
            learning_rate = config.learning_rate,
            "bandit engine ready"
        );
        Ok(Self {
            config,
            storage,
            inner: Mutex::new(BanditInner { table, rng }),
        })
    }

    /// Create an engine with a fixed seed (for testing)
    pub fn with_seed(config: CategoryConfig, storage: PersistentTable, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, storage, StdRng::seed_from_u64(seed))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn actions(&self) -> &[String] {
        &self.config.actions
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    pub fn contains(&self, action: &str) -> bool {
        self.config.contains(action)
    }

    pub fn select(&self, state: &EmotionState) -> String {
        let mut guard = self.inner.lock();
        let BanditInner { table, rng } = &mut *guard;
        let values = ensure_state(table, &self.config.actions, state);

        if rng.random::<f64>() < self.config.epsilon {
            let action = self.config.actions.choose(rng).cloned().unwrap_or_default();
            tracing::debug!(category = %self.config.name, %state, %action, "explore");
            return action;
        }

        let max = values.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let best: Vec<&String> = self
            .config
            .actions
            .iter()
            .filter(|action| values.get(*action).copied().unwrap_or(0.0) == max)
            .collect();

        // Non-empty: the action set is validated and every estimate is finite.
        let action = best.choose(rng).map(|a| (*a).clone()).unwrap_or_default();
        tracing::debug!(
            category = %self.config.name,
            %state,
            %action,
            value = max,
            tied = best.len(),
            "exploit"
        );
        action
    }

    /// Applies one reward and writes the full table through to storage.
    ///
    /// On a persistence error the in-memory estimate has already moved;
    /// the error tells the caller the change is not durable.
    pub fn update(
        &self,
        state: &EmotionState,
        action: &str,
        reward: Reward,
    ) -> Result<ValueUpdate, EngineError> {
        if !self.contains(action) {
            return Err(EngineError::ActionNotInCategory {
                category: self.config.name.clone(),
                action: action.to_string(),
            });
        }

        let mut guard = self.inner.lock();
        let values = ensure_state(&mut guard.table, &self.config.actions, state);
        let previous = values.get(action).copied().unwrap_or(0.0);
        let value = previous + self.config.learning_rate * (reward.value() - previous);
        values.insert(action.to_string(), value);

        tracing::info!(
            category = %self.config.name,
            %state,
            action,
            reward = reward.value(),
            previous,
            value,
            "value estimate updated"
        );

        self.storage.save(&guard.table)?;
        Ok(ValueUpdate { previous, value })
    }

    /// Current estimate without materializing the state.
    pub fn estimate(&self, state: &EmotionState, action: &str) -> f64 {
        self.inner
            .lock()
            .table
            .get(state.as_str())
            .and_then(|values| values.get(action).copied())
            .unwrap_or(0.0)
    }

    /// Estimates for every action under `state`; unseen states read as all zero.
    pub fn state_values(&self, state: &EmotionState) -> ActionValues {
        let guard = self.inner.lock();
        match guard.table.get(state.as_str()) {
            Some(values) => values.clone(),
            None => zeroed(&self.config.actions),
        }
    }

    pub fn snapshot(&self) -> ValueTable {
        self.inner.lock().table.clone()
    }
}

fn ensure_state<'a>(
    table: &'a mut ValueTable,
    actions: &[String],
    state: &EmotionState,
) -> &'a mut ActionValues {
    table
        .entry(state.as_str().to_string())
        .or_insert_with(|| zeroed(actions))
}

fn zeroed(actions: &[String]) -> ActionValues {
    actions.iter().map(|a| (a.clone(), 0.0)).collect()
}
