use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use crate::affect::config::{RuleConfig, RuleGroup};
use crate::affect::types::EmotionState;

/// Rule-based choice for the non-learned categories. The emotion picks a
/// group, the group's options for the category are sampled uniformly.
pub struct CategoricalRules {
    config: RuleConfig,
    rng: Mutex<StdRng>,
}

impl CategoricalRules {
    pub fn new(mut config: RuleConfig, rng: StdRng) -> Self {
        config.groups = config.groups.into_iter().map(RuleGroup::normalized).collect();
        config.fallback = config.fallback.normalized();
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn with_seed(config: RuleConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    pub fn categories(&self) -> &[String] {
        &self.config.categories
    }

    pub fn group_for(&self, state: &EmotionState) -> &RuleGroup {
        self.config
            .groups
            .iter()
            .find(|group| group.matches(state.as_str()))
            .unwrap_or(&self.config.fallback)
    }

    pub fn choose(&self, state: &EmotionState, category: &str) -> Option<String> {
        let group = self.group_for(state);
        let options = group
            .options_for(category)
            .or_else(|| self.config.fallback.options_for(category))?;
        let choice = options.choose(&mut *self.rng.lock()).cloned();
        tracing::debug!(%state, category, group = %group.name, choice = ?choice, "rule choice");
        choice
    }
}
