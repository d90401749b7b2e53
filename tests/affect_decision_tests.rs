mod common;

use std::collections::HashMap;
use std::sync::Arc;

use affect_recommender::affect::config::CategoryConfig;
use affect_recommender::affect::decision::BanditEngine;
use affect_recommender::affect::persistence::{MemoryStore, PersistentTable, TableStore};
use affect_recommender::affect::types::{EmotionState, Reward, ValueTable};

fn state(label: &str) -> EmotionState {
    EmotionState::parse(label).unwrap()
}

fn greedy_engine(actions: &[&str], seed: u64) -> (BanditEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = CategoryConfig::new("music", actions.iter().copied()).with_epsilon(0.0);
    let storage = PersistentTable::new("music", store.clone());
    (BanditEngine::with_seed(config, storage, seed).unwrap(), store)
}

fn preloaded_engine(values: &[(&str, f64)], seed: u64) -> BanditEngine {
    let store = Arc::new(MemoryStore::new());
    let mut table = ValueTable::new();
    table.insert(
        "sad".into(),
        values.iter().map(|(a, v)| (a.to_string(), *v)).collect(),
    );
    store.write("music", &table).unwrap();

    let actions: Vec<&str> = values.iter().map(|(a, _)| *a).collect();
    let config = CategoryConfig::new("music", actions).with_epsilon(0.0);
    BanditEngine::with_seed(config, PersistentTable::new("music", store), seed).unwrap()
}

#[test]
fn greedy_select_returns_unique_maximum() {
    let engine = preloaded_engine(&[("A", 0.1), ("B", 0.7), ("C", -0.3)], 5);
    for _ in 0..200 {
        assert_eq!(engine.select(&state("sad")), "B");
    }
}

#[test]
fn greedy_select_spreads_ties_evenly() {
    let engine = preloaded_engine(&[("A", 0.5), ("B", 0.5), ("C", 0.1), ("D", 0.5)], 9);
    let mut counts: HashMap<String, usize> = HashMap::new();
    let trials = 3000;
    for _ in 0..trials {
        *counts.entry(engine.select(&state("sad"))).or_default() += 1;
    }

    assert!(!counts.contains_key("C"));
    for action in ["A", "B", "D"] {
        let share = counts[action] as f64 / trials as f64;
        assert!((share - 1.0 / 3.0).abs() < 0.05, "{action} share {share}");
    }
}

#[test]
fn update_moves_by_exact_step() {
    let (engine, _) = greedy_engine(&["A", "B"], 1);
    let sad = state("sad");
    let mut expected = 0.0;
    for reward in [1.0, -1.0, 0.5, 1.0] {
        let update = engine.update(&sad, "A", Reward::new(reward).unwrap()).unwrap();
        assert!((update.previous - expected).abs() < 1e-12);
        expected += 0.1 * (reward - expected);
        assert!((update.value - expected).abs() < 1e-12);
        assert!((update.value - update.previous).abs() <= 0.1 * (reward - update.previous).abs() + 1e-12);
    }
    assert_eq!(engine.estimate(&sad, "B"), 0.0);
}

#[test]
fn repeated_positive_reward_converges() {
    let (engine, _) = greedy_engine(&["A", "B"], 1);
    let sad = state("sad");
    for _ in 0..50 {
        engine.update(&sad, "A", Reward::POSITIVE).unwrap();
    }
    assert!(engine.estimate(&sad, "A") > 0.99);
}

#[test]
fn discount_does_not_affect_update() {
    let store = Arc::new(MemoryStore::new());
    let mut config = CategoryConfig::new("music", ["A", "B"]);
    config.discount = 0.0;
    let engine = BanditEngine::with_seed(config, PersistentTable::new("music", store), 1).unwrap();
    let update = engine.update(&state("sad"), "A", Reward::POSITIVE).unwrap();
    assert!((update.value - 0.1).abs() < 1e-12);
}

#[test]
fn update_writes_through_to_store() {
    let (engine, store) = greedy_engine(&["A", "B", "C"], 1);
    engine.update(&state("Sad"), "C", Reward::NEGATIVE).unwrap();

    let stored = store.read("music").unwrap().unwrap();
    assert_eq!(stored["sad"].len(), 3);
    assert!((stored["sad"]["C"] + 0.1).abs() < 1e-12);
    assert_eq!(stored["sad"]["A"], 0.0);
}

#[test]
fn states_are_independent() {
    let (engine, _) = greedy_engine(&["A", "B"], 1);
    engine.update(&state("sad"), "A", Reward::POSITIVE).unwrap();
    assert_eq!(engine.estimate(&state("happy"), "A"), 0.0);
    assert_eq!(engine.select(&state("sad")), "A");
}

#[test]
fn concurrent_updates_are_not_lost() {
    let (engine, store) = greedy_engine(&["A", "B", "C"], 1);
    let engine = Arc::new(engine);
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let label = if i % 2 == 0 { "anxious" } else { "Anxious" };
                for _ in 0..per_thread {
                    engine.select(&state(label));
                    engine.update(&state(label), "B", Reward::POSITIVE).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let n = (threads * per_thread) as i32;
    let expected = 1.0 - 0.9f64.powi(n);
    let value = engine.estimate(&state("anxious"), "B");
    assert!((value - expected).abs() < 1e-9);

    let stored = store.read("music").unwrap().unwrap();
    assert!((stored["anxious"]["B"] - expected).abs() < 1e-9);
}
