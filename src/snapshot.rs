//! File snapshots of plan state, one JSON document per scope.
//!
//! Each save goes through a temporary file in the target directory that is
//! renamed over the previous snapshot, so readers see either the old or the
//! new state and never a partial write.

use crate::plan::PlanState;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Directory of plan state snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot file of a scope; characters unsafe in file names become `_`
    pub fn path_for(&self, scope: &str) -> PathBuf {
        let file_name: String = scope
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    /// Read the snapshot of a scope, `None` if it was never saved
    pub fn load(&self, scope: &str) -> Result<Option<PlanState>> {
        let path = self.path_for(scope);
        if !path.exists() {
            debug!(scope = %scope, path = %path.display(), "No snapshot found");
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let state = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt snapshot {}", path.display()))?;
        Ok(Some(state))
    }

    /// Read the snapshot of a scope, or start an empty state
    pub fn load_or_new(&self, scope: &str) -> Result<PlanState> {
        Ok(self.load(scope)?.unwrap_or_else(|| PlanState::new(scope)))
    }

    /// Atomically replace the snapshot of the state's scope
    pub fn save(&self, state: &PlanState) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state directory {}", self.dir.display()))?;

        let path = self.path_for(&state.scope);
        let json = serde_json::to_string_pretty(state).context("Failed to serialize plan state")?;

        let mut temp = NamedTempFile::new_in(&self.dir).context("Failed to create temporary snapshot")?;
        temp.write_all(json.as_bytes())
            .context("Failed to write temporary snapshot")?;
        temp.as_file()
            .sync_all()
            .context("Failed to flush temporary snapshot")?;
        temp.persist(&path)
            .with_context(|| format!("Failed to replace snapshot {}", path.display()))?;

        info!(scope = %state.scope, path = %path.display(), "Plan state snapshot saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grocery::GroceryList;
    use tempfile::TempDir;

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("household-7").unwrap().is_none());
        assert_eq!(store.load_or_new("household-7").unwrap(), PlanState::new("household-7"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));

        let state = PlanState::new("household-7").add_manual_item("coffee", "1 bag", None);
        let path = store.save(&state).unwrap();
        assert!(path.ends_with("household-7.json"));

        let loaded = store.load("household-7").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut state = PlanState::new("household-7");
        store.save(&state).unwrap();
        state.grocery = Some(GroceryList::new("household-7"));
        store.save(&state).unwrap();

        assert_eq!(store.load("household-7").unwrap().unwrap(), state);
        let files = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_scope_is_sanitized_for_file_names() {
        let store = SnapshotStore::new("/plans");
        assert_eq!(store.path_for("org/team a"), PathBuf::from("/plans/org_team_a.json"));
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.path_for("household-7"), "{not json").unwrap();
        assert!(store.load("household-7").is_err());
    }
}
