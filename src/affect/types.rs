use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affect::error::EngineError;

/// Estimates for every action of one category under a single state.
pub type ActionValues = BTreeMap<String, f64>;

/// State label -> action -> running estimate. This is also the persisted shape.
pub type ValueTable = BTreeMap<String, ActionValues>;

/// Continuous physiological signals supplied by the upstream detector.
pub type Features = HashMap<String, f64>;

pub const EYE_OPENNESS: &str = "eye_openness";
pub const BROW_RATIO: &str = "brow_ratio";

pub const MIN_REWARD: f64 = -1.0;
pub const MAX_REWARD: f64 = 1.0;

/// A trimmed, lower-cased emotion label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EmotionState(String);

impl EmotionState {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EngineError::InvalidState);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feedback signal. Thumbs up is `+1`, thumbs down is `-1`; anything in
/// between is accepted and moves the estimate proportionally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Reward(f64);

impl Reward {
    pub const POSITIVE: Reward = Reward(MAX_REWARD);
    pub const NEGATIVE: Reward = Reward(MIN_REWARD);

    pub fn new(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() || !(MIN_REWARD..=MAX_REWARD).contains(&value) {
            return Err(EngineError::InvalidReward(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    Fatigue,
    Stress,
}

impl OverrideKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatigue => "fatigue",
            Self::Stress => "stress",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_rule: Option<OverrideKind>,
    pub items: BTreeMap<String, String>,
}

impl Recommendation {
    pub fn get(&self, category: &str) -> Option<&str> {
        self.items.get(category).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueUpdate {
    pub previous: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAck {
    pub category: String,
    pub state: String,
    pub action: String,
    pub previous_value: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub state: String,
    pub action: String,
    pub category: String,
    pub reward: f64,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_normalized() {
        let state = EmotionState::parse("  Sad ").unwrap();
        assert_eq!(state.as_str(), "sad");
    }

    #[test]
    fn test_blank_state_rejected() {
        assert!(matches!(EmotionState::parse(""), Err(EngineError::InvalidState)));
        assert!(matches!(EmotionState::parse("   "), Err(EngineError::InvalidState)));
    }

    #[test]
    fn test_reward_range() {
        assert!(Reward::new(1.0).is_ok());
        assert!(Reward::new(-1.0).is_ok());
        assert!(Reward::new(0.25).is_ok());
        assert!(matches!(Reward::new(2.0), Err(EngineError::InvalidReward(_))));
        assert!(Reward::new(f64::NAN).is_err());
        assert!(Reward::new(f64::INFINITY).is_err());
    }
}
