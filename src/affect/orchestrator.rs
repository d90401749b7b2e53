use std::collections::BTreeMap;
use std::sync::Arc;

use crate::affect::decision::{BanditEngine, CategoricalRules, OverrideRuleSet};
use crate::affect::types::{EmotionState, Features, Recommendation};

/// Composes one recommendation per configured category: overrides first,
/// then the categorical rules, then the learned bandits.
pub struct RecommendationOrchestrator {
    overrides: OverrideRuleSet,
    rules: CategoricalRules,
    engines: Vec<Arc<BanditEngine>>,
}

impl RecommendationOrchestrator {
    pub fn new(overrides: OverrideRuleSet, rules: CategoricalRules, engines: Vec<Arc<BanditEngine>>) -> Self {
        Self {
            overrides,
            rules,
            engines,
        }
    }

    pub fn recommend(&self, state: &EmotionState, features: Option<&Features>) -> Recommendation {
        let decision = self.overrides.evaluate(state, features);
        let mut items = BTreeMap::new();

        if let Some(ref decision) = decision {
            items.extend(decision.values.clone());
        }

        for category in self.rules.categories() {
            if items.contains_key(category) {
                continue;
            }
            if let Some(choice) = self.rules.choose(state, category) {
                items.insert(category.clone(), choice);
            }
        }

        for engine in &self.engines {
            if items.contains_key(engine.name()) {
                continue;
            }
            items.insert(engine.name().to_string(), engine.select(state));
        }

        let override_rule = decision.map(|d| d.kind);
        tracing::info!(
            %state,
            override_rule = override_rule.map(|k| k.as_str()),
            items = items.len(),
            "recommendation composed"
        );

        Recommendation {
            state: state.as_str().to_string(),
            override_rule,
            items,
        }
    }
}
