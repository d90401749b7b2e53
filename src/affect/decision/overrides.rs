use std::collections::{BTreeMap, HashSet};

use crate::affect::config::{OverrideConfig, OverrideRule};
use crate::affect::types::{EmotionState, Features, OverrideKind, BROW_RATIO, EYE_OPENNESS};

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDecision {
    pub kind: OverrideKind,
    pub values: BTreeMap<String, String>,
}

/// Physiology-driven rules that pin specific categories, checked in
/// priority order: fatigue, then stress.
#[derive(Debug, Clone)]
pub struct OverrideRuleSet {
    fatigue: OverrideRule,
    stress: OverrideRule,
    positive_labels: HashSet<String>,
}

impl OverrideRuleSet {
    pub fn new(config: &OverrideConfig) -> Self {
        Self {
            fatigue: config.fatigue.clone(),
            stress: config.stress.clone(),
            positive_labels: config
                .positive_labels
                .iter()
                .map(|label| label.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn evaluate(&self, state: &EmotionState, features: Option<&Features>) -> Option<OverrideDecision> {
        let features = features?;

        if let Some(eye) = feature(features, EYE_OPENNESS) {
            if eye < self.fatigue.threshold {
                tracing::debug!(%state, eye_openness = eye, "fatigue override");
                return Some(OverrideDecision {
                    kind: OverrideKind::Fatigue,
                    values: self.fatigue.values.clone(),
                });
            }
        }

        if let Some(brow) = feature(features, BROW_RATIO) {
            if brow < self.stress.threshold {
                if self.is_positive(state) {
                    tracing::debug!(%state, brow_ratio = brow, "stress override suppressed by positive emotion");
                    return None;
                }
                tracing::debug!(%state, brow_ratio = brow, "stress override");
                return Some(OverrideDecision {
                    kind: OverrideKind::Stress,
                    values: self.stress.values.clone(),
                });
            }
        }

        None
    }

    pub fn is_positive(&self, state: &EmotionState) -> bool {
        self.positive_labels.contains(state.as_str())
    }
}

fn feature(features: &Features, key: &str) -> Option<f64> {
    features.get(key).copied().filter(|v| v.is_finite())
}
