use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::affect::error::PersistenceError;
use crate::affect::types::FeedbackRecord;

pub const DEFAULT_JOURNAL_FILE: &str = "feedback_history.jsonl";

/// Append-only JSON-lines history of accepted feedback events.
pub struct FeedbackJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_JOURNAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &FeedbackRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .map_err(|e| PersistenceError::io(&self.path, e))
    }

    /// Every well-formed record, oldest first. Malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path).map_err(|e| PersistenceError::io(&self.path, e))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| PersistenceError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(line = idx + 1, error = %err, "skipping malformed feedback record");
                }
            }
        }
        Ok(records)
    }
}
