use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::affect::error::PersistenceError;
use crate::affect::types::{ActionValues, ValueTable};

/// Durable backing for per-category value tables.
///
/// `read` returns `Ok(None)` when nothing has been stored yet; any error
/// means the stored document is unreadable or has an unexpected shape.
pub trait TableStore: Send + Sync {
    fn read(&self, category: &str) -> Result<Option<ValueTable>, PersistenceError>;
    fn write(&self, category: &str, table: &ValueTable) -> Result<(), PersistenceError>;
}

/// One pretty-printed JSON document per category, `<dir>/<category>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{category}.json"))
    }
}

impl TableStore for JsonFileStore {
    fn read(&self, category: &str) -> Result<Option<ValueTable>, PersistenceError> {
        let path = self.path_for(category);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| PersistenceError::io(&path, e))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write(&self, category: &str, table: &ValueTable) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;

        let path = self.path_for(category);
        let temp_path = self.dir.join(format!(".{category}.json.tmp"));
        let json = serde_json::to_vec_pretty(table)?;

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(err) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(PersistenceError::io(&temp_path, err));
        }

        if let Err(err) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(PersistenceError::io(&path, err));
        }
        sync_dir(&self.dir)
    }
}

/// Flushes the directory entry so the rename itself survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), PersistenceError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| PersistenceError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), PersistenceError> {
    Ok(())
}

/// Process-local store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, ValueTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn read(&self, category: &str) -> Result<Option<ValueTable>, PersistenceError> {
        Ok(self.tables.lock().get(category).cloned())
    }

    fn write(&self, category: &str, table: &ValueTable) -> Result<(), PersistenceError> {
        self.tables.lock().insert(category.to_string(), table.clone());
        Ok(())
    }
}

/// Storage handle for exactly one category's table.
#[derive(Clone)]
pub struct PersistentTable {
    category: String,
    store: Arc<dyn TableStore>,
}

impl PersistentTable {
    pub fn new(category: impl Into<String>, store: Arc<dyn TableStore>) -> Self {
        Self {
            category: category.into(),
            store,
        }
    }

    /// Never fails: a missing document yields an empty table and a corrupt
    /// one is logged and replaced by an empty table.
    pub fn load(&self, actions: &[String]) -> ValueTable {
        match self.store.read(&self.category) {
            Ok(Some(raw)) => reconcile(&self.category, raw, actions),
            Ok(None) => ValueTable::new(),
            Err(err) => {
                tracing::warn!(
                    category = %self.category,
                    error = %err,
                    "value table unreadable, reinitializing empty"
                );
                ValueTable::new()
            }
        }
    }

    pub fn save(&self, table: &ValueTable) -> Result<(), PersistenceError> {
        self.store.write(&self.category, table)
    }
}

/// Re-normalizes stored state keys and aligns every state with the
/// configured action set.
fn reconcile(category: &str, raw: ValueTable, actions: &[String]) -> ValueTable {
    let mut table = ValueTable::new();
    for (state, stored) in raw {
        let key = state.trim().to_lowercase();
        if key.is_empty() {
            tracing::warn!(category, "dropping stored entry with empty state label");
            continue;
        }

        let dropped = stored.keys().filter(|a| !actions.contains(*a)).count();
        if dropped > 0 {
            tracing::info!(category, state = %key, dropped, "dropping estimates for retired actions");
        }

        let values: ActionValues = actions
            .iter()
            .map(|action| {
                let value = stored
                    .get(action)
                    .copied()
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0);
                (action.clone(), value)
            })
            .collect();

        // On a collision the entry already stored under its normalized
        // key wins, whatever order the document lists them in.
        if table.contains_key(&key) {
            let replace = state == key;
            tracing::warn!(category, state = %key, raw = %state, replace, "duplicate state after normalization");
            if !replace {
                continue;
            }
        }
        table.insert(key, values);
    }
    table
}
