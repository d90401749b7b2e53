#![allow(dead_code)]

use std::sync::Arc;

use affect_recommender::affect::config::{CategoryConfig, EngineConfig};
use affect_recommender::affect::error::PersistenceError;
use affect_recommender::affect::persistence::{MemoryStore, TableStore};
use affect_recommender::affect::types::ValueTable;
use affect_recommender::AffectEngine;

pub fn greedy_config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig {
        seed: Some(seed),
        ..Default::default()
    };
    for category in &mut config.categories {
        category.epsilon = 0.0;
    }
    config
}

pub fn abc_config(seed: u64) -> EngineConfig {
    EngineConfig {
        categories: vec![CategoryConfig::new("music", ["A", "B", "C"]).with_epsilon(0.0)],
        seed: Some(seed),
        ..Default::default()
    }
}

pub fn memory_engine(config: EngineConfig) -> (AffectEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = AffectEngine::new(config, store.clone()).expect("valid config");
    (engine, store)
}

/// Reads fine, refuses every write.
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl TableStore for ReadOnlyStore {
    fn read(&self, category: &str) -> Result<Option<ValueTable>, PersistenceError> {
        self.inner.read(category)
    }

    fn write(&self, _category: &str, _table: &ValueTable) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("read-only store".into()))
    }
}
