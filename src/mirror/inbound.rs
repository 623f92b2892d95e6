use crate::feed::{self, FeedTally};
use crate::mirror::config::MirrorConfig;
use crate::mirror::paths::MirrorPaths;
use crate::mirror::state::{InboundCursor, WatchState};
use crate::mirror::sync::Orchestrator;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const FEED_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone)]
pub struct InboundWatchEvent {
    pub file_path: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct InboundWatchOutcome {
    pub enabled: bool,
    pub watched_paths: Vec<String>,
    pub scanned_files: usize,
    pub changed_files: usize,
    pub tally: FeedTally,
    pub events: Vec<InboundWatchEvent>,
}

fn collect_files(root: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(root).with_context(|| format!("failed to read {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if path.extension().and_then(|e| e.to_str()) == Some(FEED_EXTENSION) {
                out.push(path);
            }
            continue;
        }
        if recursive && path.is_dir() {
            collect_files(&path, recursive, out)?;
        }
    }
    Ok(())
}

fn first_line_fingerprint(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == b'\n')?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes[..end]);
    Some(format!("{:x}", hasher.finalize()))
}

/// Where to resume reading `bytes`, given the stored cursor.
fn resume_offset(cursor: Option<&InboundCursor>, bytes: &[u8], fingerprint: &str) -> usize {
    match cursor {
        Some(c) if c.fingerprint == fingerprint && (c.offset as usize) <= bytes.len() => {
            c.offset as usize
        }
        _ => 0,
    }
}

pub fn watch_dirs(paths: &MirrorPaths, cfg: &MirrorConfig) -> Vec<PathBuf> {
    if cfg.inbound.watch_paths.is_empty() {
        vec![paths.inbound_dir.clone()]
    } else {
        cfg.inbound.watch_paths.iter().map(PathBuf::from).collect()
    }
}

/// Applies the complete lines appended to each feed file since the last cycle.
pub fn process(
    paths: &MirrorPaths,
    cfg: &MirrorConfig,
    state: &mut WatchState,
    orch: &mut Orchestrator,
) -> Result<InboundWatchOutcome> {
    let dirs = watch_dirs(paths, cfg);
    let mut out = InboundWatchOutcome {
        enabled: cfg.inbound.enabled,
        watched_paths: dirs.iter().map(|d| d.display().to_string()).collect(),
        ..InboundWatchOutcome::default()
    };

    if !cfg.inbound.enabled {
        return Ok(out);
    }

    let mut files = Vec::new();
    for dir in &dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create inbound watch dir {}", dir.display()))?;
        }
        collect_files(dir, cfg.inbound.recursive, &mut files)?;
    }

    files.sort();
    let mut currently_seen = BTreeSet::new();

    for file in files {
        let key = file.display().to_string();
        currently_seen.insert(key.clone());
        out.scanned_files += 1;

        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                out.events.push(InboundWatchEvent {
                    file_path: key,
                    status: "failed".to_string(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        let Some(fingerprint) = first_line_fingerprint(&bytes) else {
            continue;
        };

        let previous = state.inbound_cursors.get(&key);
        let start = resume_offset(previous, &bytes, &fingerprint);
        if previous.is_some_and(|c| c.offset as usize != start) {
            tracing::info!(file = %key, "inbound feed replaced or truncated; reading from start");
        }

        let pending = &bytes[start..];
        let Some(last_newline) = pending.iter().rposition(|b| *b == b'\n') else {
            continue;
        };
        let complete = &pending[..=last_newline];
        let base_line = bytes[..start].iter().filter(|b| **b == b'\n').count();

        let mut tally = FeedTally::default();
        for (idx, raw) in complete.split(|b| *b == b'\n').enumerate() {
            let line = String::from_utf8_lossy(raw);
            feed::apply_line(orch, &key, base_line + idx + 1, &line, &mut tally);
        }

        state.inbound_cursors.insert(
            key.clone(),
            InboundCursor {
                offset: (start + complete.len()) as u64,
                fingerprint,
            },
        );
        crate::mirror::state::save(paths, state)?;
        out.changed_files += 1;
        out.events.push(InboundWatchEvent {
            file_path: key,
            status: if tally.failed + tally.malformed == 0 {
                "applied".to_string()
            } else {
                "degraded".to_string()
            },
            message: tally.summary(),
        });
        out.tally.absorb(&tally);
    }

    state
        .inbound_cursors
        .retain(|k, _| currently_seen.contains(k));

    Ok(out)
}
