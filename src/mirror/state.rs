use crate::mirror::paths::MirrorPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Read position within one inbound feed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCursor {
    pub offset: u64,
    /// SHA-256 of the file's first line, used to detect replaced files.
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchState {
    pub schema_version: u32,
    pub last_heartbeat_epoch_secs: u64,
    pub inbound_cursors: BTreeMap<String, InboundCursor>,
    pub total_lines: u64,
    pub total_applied: u64,
    pub total_failed: u64,
}

impl Default for WatchState {
    fn default() -> Self {
        Self {
            schema_version: 1,
            last_heartbeat_epoch_secs: 0,
            inbound_cursors: BTreeMap::new(),
            total_lines: 0,
            total_applied: 0,
            total_failed: 0,
        }
    }
}

pub fn state_file_path(paths: &MirrorPaths) -> PathBuf {
    paths.state_dir.join("watch_state.json")
}

pub fn load(paths: &MirrorPaths) -> Result<WatchState> {
    let file = state_file_path(paths);
    if !file.exists() {
        return Ok(WatchState::default());
    }

    let raw =
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: WatchState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(parsed)
}

pub fn save(paths: &MirrorPaths, state: &WatchState) -> Result<PathBuf> {
    let file = state_file_path(paths);
    crate::mirror::store::write_json(&file, state)
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::paths::test_paths;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = tempdir().expect("tempdir");
        let state = load(&test_paths(tmp.path())).expect("load");
        assert_eq!(state.schema_version, 1);
        assert!(state.inbound_cursors.is_empty());
    }

    #[test]
    fn cursors_survive_save_and_load() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let mut state = WatchState::default();
        state.inbound_cursors.insert(
            "/feeds/a.jsonl".to_string(),
            InboundCursor {
                offset: 120,
                fingerprint: "abc".to_string(),
            },
        );
        state.total_applied = 3;

        let file = save(&paths, &state).expect("save");
        assert!(file.ends_with(".mirror/watch_state.json"));

        let loaded = load(&paths).expect("load");
        assert_eq!(loaded.inbound_cursors["/feeds/a.jsonl"].offset, 120);
        assert_eq!(loaded.total_applied, 3);
    }

    #[test]
    fn older_state_without_totals_still_parses() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        fs::create_dir_all(&paths.state_dir).expect("mkdir");
        fs::write(state_file_path(&paths), "{\"schema_version\":1}").expect("write");

        let loaded = load(&paths).expect("load");
        assert_eq!(loaded.total_lines, 0);
    }
}
