use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::affect::error::ConfigError;

pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_DISCOUNT: f64 = 0.9;
pub const DEFAULT_EPSILON: f64 = 0.2;
pub const DEFAULT_FATIGUE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_STRESS_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub actions: Vec<String>,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Accepted for symmetry with full Q-learning configs. Updates are
    /// single-step, so this never affects an estimate.
    #[serde(default = "default_discount")]
    pub discount: f64,
}

impl CategoryConfig {
    pub fn new<S: Into<String>>(name: impl Into<String>, actions: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            learning_rate: DEFAULT_LEARNING_RATE,
            epsilon: DEFAULT_EPSILON,
            discount: DEFAULT_DISCOUNT,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn contains(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// Checks the invariants a bandit relies on: a valid name, at least two
    /// distinct actions, alpha in (0, 1] and epsilon in [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_category_name(&self.name)?;
        if self.actions.len() < 2 {
            return Err(ConfigError::TooFewActions {
                category: self.name.clone(),
                count: self.actions.len(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(action) = self.actions.iter().find(|a| !seen.insert(a.as_str())) {
            return Err(ConfigError::OverlappingAction {
                action: action.clone(),
                first: self.name.clone(),
                second: self.name.clone(),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::LearningRate {
                category: self.name.clone(),
                value: self.learning_rate,
            });
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::ExplorationRate {
                category: self.name.clone(),
                value: self.epsilon,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRule {
    pub threshold: f64,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideConfig {
    pub fatigue: OverrideRule,
    pub stress: OverrideRule,
    pub positive_labels: Vec<String>,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            fatigue: OverrideRule {
                threshold: DEFAULT_FATIGUE_THRESHOLD,
                values: string_map([
                    ("therapy", "Sleep Hygiene Guidance"),
                    ("meditation", "Yoga Nidra for Sleep"),
                    ("activity", "Wind-Down Routine"),
                ]),
            },
            stress: OverrideRule {
                threshold: DEFAULT_STRESS_THRESHOLD,
                values: string_map([
                    ("therapy", "Stress Management Techniques"),
                    ("meditation", "Box Breathing"),
                    ("activity", "Progressive Muscle Relaxation"),
                ]),
            },
            positive_labels: default_positive_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub options: BTreeMap<String, Vec<String>>,
}

impl RuleGroup {
    /// `state` is expected to be normalized already (trimmed, lower-cased).
    pub fn matches(&self, state: &str) -> bool {
        self.labels.iter().any(|label| label == state)
    }

    /// Trims and lower-cases labels the same way `EmotionState` does.
    pub fn normalized(mut self) -> Self {
        self.labels = self
            .labels
            .iter()
            .map(|label| label.trim().to_lowercase())
            .collect();
        self
    }

    pub fn options_for(&self, category: &str) -> Option<&[String]> {
        self.options
            .get(category)
            .map(Vec::as_slice)
            .filter(|options| !options.is_empty())
    }
}

/// Non-learned categories and the emotion groupings that drive them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub categories: Vec<String>,
    pub groups: Vec<RuleGroup>,
    pub fallback: RuleGroup,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            categories: vec!["therapy".into(), "meditation".into(), "activity".into()],
            groups: vec![
                RuleGroup {
                    name: "social_connection".into(),
                    labels: strings(["lonely", "loneliness", "isolated", "alone"]),
                    options: option_map([
                        ("therapy", &["Reach Out to a Friend", "Peer Support Group", "AI Chat Support"][..]),
                        ("meditation", &["Loving-Kindness Meditation", "Compassion Breathing"][..]),
                        ("activity", &["Call a Loved One", "Join a Community Class", "Volunteer Locally"][..]),
                    ]),
                },
                RuleGroup {
                    name: "positive_reinforcement".into(),
                    labels: default_positive_labels(),
                    options: option_map([
                        ("therapy", &["Gratitude Journaling", "Positive Affirmations", "Mindfulness Exercise"][..]),
                        ("meditation", &["Joy Savoring Meditation", "Mindful Walking"][..]),
                        ("activity", &["Share Good News", "Creative Hobby Time", "Outdoor Walk"][..]),
                    ]),
                },
            ],
            fallback: RuleGroup {
                name: "coping_skills".into(),
                labels: Vec::new(),
                options: option_map([
                    ("therapy", &["Deep Breathing", "Cognitive Reframing", "Mindfulness Exercise"][..]),
                    ("meditation", &["Guided Breathing", "Body Scan", "Calm Focus Meditation"][..]),
                    ("activity", &["Light Stretching", "Short Walk", "Journaling"][..]),
                ]),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub overrides: OverrideConfig,
    /// Base seed for every random source. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryConfig::new(
                    "music",
                    ["Lo-fi Beats", "Classical Piano", "Upbeat Pop", "Acoustic Chill", "Nature Sounds"],
                ),
                CategoryConfig::new(
                    "movie",
                    ["Feel-Good Comedy", "Inspiring Drama", "Animated Adventure", "Nature Documentary"],
                ),
                CategoryConfig::new(
                    "game",
                    ["Puzzle Game", "Cozy Farming Sim", "Rhythm Game", "Casual Co-op Game"],
                ),
            ],
            rules: RuleConfig::default(),
            overrides: OverrideConfig::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Applies process-wide overrides from the environment.
    pub fn apply_env(mut self) -> Self {
        if let Some(val) = env_f64("BANDIT_LEARNING_RATE") {
            for category in &mut self.categories {
                category.learning_rate = val;
            }
        }
        if let Some(val) = env_f64("BANDIT_EPSILON") {
            for category in &mut self.categories {
                category.epsilon = val;
            }
        }
        if let Some(val) = env_f64("FATIGUE_EYE_THRESHOLD") {
            self.overrides.fatigue.threshold = val;
        }
        if let Some(val) = env_f64("STRESS_BROW_THRESHOLD") {
            self.overrides.stress.threshold = val;
        }
        if let Ok(val) = std::env::var("RNG_SEED") {
            if let Ok(seed) = val.trim().parse() {
                self.seed = Some(seed);
            }
        }
        self
    }

    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Learned categories first, then rule-based ones, in configuration order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.rules.categories.iter().map(String::as_str))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        let mut seen_categories = HashSet::new();
        let mut action_owner: HashMap<&str, &str> = HashMap::new();

        for category in &self.categories {
            category.validate()?;
            if !seen_categories.insert(category.name.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
            for action in &category.actions {
                if let Some(first) = action_owner.insert(action.as_str(), category.name.as_str()) {
                    return Err(ConfigError::OverlappingAction {
                        action: action.clone(),
                        first: first.to_string(),
                        second: category.name.clone(),
                    });
                }
            }
        }

        for name in &self.rules.categories {
            validate_category_name(name)?;
            if !seen_categories.insert(name.as_str()) {
                return Err(ConfigError::DuplicateCategory(name.clone()));
            }
            if self.rules.fallback.options_for(name).is_none() {
                return Err(ConfigError::MissingFallback(name.clone()));
            }
        }

        for group in self.rules.groups.iter().chain(std::iter::once(&self.rules.fallback)) {
            for (category, options) in &group.options {
                if let Some(option) = options.iter().find(|o| action_owner.contains_key(o.as_str())) {
                    return Err(ConfigError::RuleOptionCollision {
                        category: category.clone(),
                        option: option.clone(),
                    });
                }
            }
        }

        for (rule, cfg) in [("fatigue", &self.overrides.fatigue), ("stress", &self.overrides.stress)] {
            if !cfg.threshold.is_finite() {
                return Err(ConfigError::Threshold {
                    rule: rule.to_string(),
                    value: cfg.threshold,
                });
            }
            for (category, value) in &cfg.values {
                if !seen_categories.contains(category.as_str()) {
                    return Err(ConfigError::UnknownOverrideCategory {
                        rule: rule.to_string(),
                        category: category.clone(),
                    });
                }
                if let Some(learned) = self.category(category) {
                    if !learned.contains(value) {
                        return Err(ConfigError::OverrideValueNotInCategory {
                            rule: rule.to_string(),
                            category: category.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_category_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidCategoryName(name.to_string()))
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_discount() -> f64 {
    DEFAULT_DISCOUNT
}

fn default_positive_labels() -> Vec<String> {
    strings(["happy", "surprise", "positive", "joy", "excited", "content"])
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn string_map<const N: usize>(items: [(&str, &str); N]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn option_map<const N: usize>(items: [(&str, &[&str]); N]) -> BTreeMap<String, Vec<String>> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_overlapping_actions_rejected() {
        let mut config = EngineConfig::default();
        config.categories[1].actions.push("Lo-fi Beats".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingAction { ref action, .. }) if action == "Lo-fi Beats"
        ));
    }

    #[test]
    fn test_single_action_category_rejected() {
        let mut config = EngineConfig::default();
        config.categories[0].actions.truncate(1);
        assert!(matches!(config.validate(), Err(ConfigError::TooFewActions { count: 1, .. })));
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.categories[0].learning_rate = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::LearningRate { .. })));

        let mut config = EngineConfig::default();
        config.categories[2].epsilon = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::ExplorationRate { .. })));
    }

    #[test]
    fn test_rule_category_without_fallback_rejected() {
        let mut config = EngineConfig::default();
        config.rules.categories.push("journaling".into());
        assert!(matches!(config.validate(), Err(ConfigError::MissingFallback(_))));
    }

    #[test]
    fn test_override_unknown_category_rejected() {
        let mut config = EngineConfig::default();
        config
            .overrides
            .fatigue
            .values
            .insert("podcast".into(), "Sleep Stories".into());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownOverrideCategory { .. })));
    }

    #[test]
    fn test_rule_option_collision_rejected() {
        let mut config = EngineConfig::default();
        config
            .rules
            .fallback
            .options
            .get_mut("activity")
            .unwrap()
            .push("Puzzle Game".into());
        assert!(matches!(config.validate(), Err(ConfigError::RuleOptionCollision { .. })));
    }

    #[test]
    fn test_category_validate_rejects_bad_action_sets() {
        let empty = CategoryConfig::new("music", Vec::<String>::new());
        assert!(matches!(empty.validate(), Err(ConfigError::TooFewActions { count: 0, .. })));

        let single = CategoryConfig::new("music", ["A"]);
        assert!(matches!(single.validate(), Err(ConfigError::TooFewActions { count: 1, .. })));

        let repeated = CategoryConfig::new("music", ["A", "B", "A"]);
        assert!(matches!(repeated.validate(), Err(ConfigError::OverlappingAction { .. })));
    }

    #[test]
    fn test_category_validate_rejects_bad_rates() {
        let nan_epsilon = CategoryConfig::new("music", ["A", "B"]).with_epsilon(f64::NAN);
        assert!(matches!(nan_epsilon.validate(), Err(ConfigError::ExplorationRate { .. })));

        let big_alpha = CategoryConfig::new("music", ["A", "B"]).with_learning_rate(1.5);
        assert!(matches!(big_alpha.validate(), Err(ConfigError::LearningRate { .. })));

        let bad_name = CategoryConfig::new("Music/..", ["A", "B"]);
        assert!(matches!(bad_name.validate(), Err(ConfigError::InvalidCategoryName(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        std::env::set_var("BANDIT_LEARNING_RATE", "0.25");
        std::env::set_var("BANDIT_EPSILON", "0.05");
        std::env::set_var("FATIGUE_EYE_THRESHOLD", "0.12");
        std::env::set_var("STRESS_BROW_THRESHOLD", "not-a-number");
        std::env::set_var("RNG_SEED", "99");
        let config = EngineConfig::default().apply_env();
        for key in [
            "BANDIT_LEARNING_RATE",
            "BANDIT_EPSILON",
            "FATIGUE_EYE_THRESHOLD",
            "STRESS_BROW_THRESHOLD",
            "RNG_SEED",
        ] {
            std::env::remove_var(key);
        }

        assert!(config.categories.iter().all(|c| c.learning_rate == 0.25));
        assert!(config.categories.iter().all(|c| c.epsilon == 0.05));
        assert_eq!(config.overrides.fatigue.threshold, 0.12);
        assert_eq!(config.overrides.stress.threshold, DEFAULT_STRESS_THRESHOLD);
        assert_eq!(config.seed, Some(99));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"categories":[{"name":"music","actions":["A","B"],"epsilon":0.0}],"seed":7}"#,
        )
        .unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.categories[0].epsilon, 0.0);

        assert!(matches!(
            EngineConfig::from_file(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let raw = r#"{"categories":[{"name":"music","actions":["A","B"]}]}"#;
        let config: EngineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.categories[0].learning_rate, DEFAULT_LEARNING_RATE);
        assert_eq!(config.categories[0].epsilon, DEFAULT_EPSILON);
        assert_eq!(config.rules.categories.len(), 3);
        config.validate().unwrap();
    }
}
