use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

/// Single persisted integer: the best score so far.
///
/// Stores must not fail toward the caller; anything that goes wrong is
/// handled (and logged) inside the implementation.
pub trait HighScoreStore {
    /// 0 when nothing has been written yet
    fn read(&self) -> u32;
    fn write(&mut self, score: u32);
    /// When the stored score was set, if the store keeps track
    fn achieved_at(&self) -> Option<DateTime<Local>> {
        None
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryHighScoreStore {
    value: u32,
    achieved_at: Option<DateTime<Local>>,
    writes: Vec<u32>,
}

impl MemoryHighScoreStore {
    pub fn new(initial: u32) -> Self {
        Self {
            value: initial,
            achieved_at: None,
            writes: Vec::new(),
        }
    }

    /// Every value passed to `write`, in call order.
    pub fn writes(&self) -> &[u32] {
        &self.writes
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn read(&self) -> u32 {
        self.value
    }

    fn write(&mut self, score: u32) {
        self.value = score;
        self.achieved_at = (score > 0).then(Local::now);
        self.writes.push(score);
    }

    fn achieved_at(&self) -> Option<DateTime<Local>> {
        self.achieved_at
    }
}

/// On-disk representation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HighScoreRecord {
    pub high_score: u32,
    pub achieved_at: Option<DateTime<Local>>,
}

/// JSON file store under the user's state directory
#[derive(Debug, Clone)]
pub struct FileHighScoreStore {
    path: PathBuf,
    record: HighScoreRecord,
}

impl FileHighScoreStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path =
            AppDirs::high_score_path().unwrap_or_else(|| PathBuf::from("whack_high_score.json"));
        Self::with_path(path)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        let path = p.as_ref().to_path_buf();
        let record = Self::load(&path);
        Self { path, record }
    }

    pub fn record(&self) -> &HighScoreRecord {
        &self.record
    }

    fn load(path: &Path) -> HighScoreRecord {
        let Ok(bytes) = fs::read(path) else {
            return HighScoreRecord::default();
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            log::warn!("ignoring malformed high score file {}: {}", path.display(), e);
            HighScoreRecord::default()
        })
    }

    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&self.record)?;
        fs::write(&self.path, data)
    }
}

impl HighScoreStore for FileHighScoreStore {
    fn read(&self) -> u32 {
        self.record.high_score
    }

    fn write(&mut self, score: u32) {
        self.record = HighScoreRecord {
            high_score: score,
            achieved_at: (score > 0).then(Local::now),
        };
        if let Err(e) = self.save() {
            log::warn!(
                "failed to persist high score to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    fn achieved_at(&self) -> Option<DateTime<Local>> {
        self.record.achieved_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_tracks_writes() {
        let mut store = MemoryHighScoreStore::new(5);
        assert_eq!(store.read(), 5);
        store.write(12);
        store.write(0);
        assert_eq!(store.read(), 0);
        assert_eq!(store.achieved_at(), None);
        assert_eq!(store.writes(), &[12, 0]);
    }

    #[test]
    fn file_store_defaults_to_zero() {
        let dir = tempdir().unwrap();
        let store = FileHighScoreStore::with_path(dir.path().join("high_score.json"));
        assert_eq!(store.read(), 0);
        assert_eq!(store.record().achieved_at, None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("high_score.json");

        let mut store = FileHighScoreStore::with_path(&path);
        store.write(42);
        assert!(store.record().achieved_at.is_some());

        let reopened = FileHighScoreStore::with_path(&path);
        assert_eq!(reopened.read(), 42);
        assert_eq!(reopened.record(), store.record());
        assert_eq!(reopened.achieved_at(), store.record().achieved_at);
    }

    #[test]
    fn clearing_drops_the_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("high_score.json");
        let mut store = FileHighScoreStore::with_path(&path);
        store.write(10);
        store.write(0);

        let reopened = FileHighScoreStore::with_path(&path);
        assert_eq!(reopened.read(), 0);
        assert_eq!(reopened.record().achieved_at, None);
    }

    #[test]
    fn malformed_file_reads_as_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("high_score.json");
        fs::write(&path, b"[1, 2").unwrap();
        assert_eq!(FileHighScoreStore::with_path(&path).read(), 0);
    }

    #[test]
    fn unwritable_path_keeps_value_in_memory() {
        let dir = tempdir().unwrap();
        // a regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let mut store = FileHighScoreStore::with_path(blocker.join("high_score.json"));
        store.write(7);
        assert_eq!(store.read(), 7);
    }
}
