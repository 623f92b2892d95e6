use crate::mirror::audit;
use crate::mirror::config::{MirrorConfig, load_config};
use crate::mirror::inbound::{self, InboundWatchOutcome};
use crate::mirror::paths::{MirrorPaths, resolve_paths};
use crate::mirror::state::{load, save};
use crate::mirror::sync::{ArchiveSettings, Orchestrator};
use crate::mirror::util::now_epoch_secs;
use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatchCycleOutcome {
    pub state_file: String,
    pub heartbeat_epoch_secs: u64,
    pub poll_interval_secs: u64,
    pub inbound_watch: InboundWatchOutcome,
}

pub fn run_cycle(paths: &MirrorPaths, cfg: &MirrorConfig) -> Result<WatchCycleOutcome> {
    let settings = ArchiveSettings::from_config(cfg)?;
    let mut orch = Orchestrator::open(paths, settings)
        .with_context(|| format!("failed to open archive {}", paths.archive_dir.display()))?;

    let mut state = load(paths)?;
    state.last_heartbeat_epoch_secs = now_epoch_secs()?;

    let inbound_watch = inbound::process(paths, cfg, &mut state, &mut orch)?;
    let tally = &inbound_watch.tally;
    state.total_lines += tally.lines as u64;
    state.total_applied += tally.applied() as u64;
    state.total_failed += (tally.failed + tally.malformed) as u64;

    let file = save(paths, &state)?;

    for event in &inbound_watch.events {
        audit::append_event(
            paths,
            "inbound",
            &event.status,
            &format!("file={} {}", event.file_path, event.message),
        )?;
    }

    Ok(WatchCycleOutcome {
        state_file: file.display().to_string(),
        heartbeat_epoch_secs: state.last_heartbeat_epoch_secs,
        poll_interval_secs: cfg.watcher.poll_interval_secs,
        inbound_watch,
    })
}

pub fn run_once() -> Result<WatchCycleOutcome> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    run_cycle(&paths, &cfg)
}

pub fn run_daemon() -> Result<()> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    tracing::info!(
        archive = %paths.archive_dir.display(),
        poll_interval_secs = cfg.watcher.poll_interval_secs,
        "watcher daemon started"
    );
    loop {
        let cycle = run_cycle(&paths, &cfg)?;
        if cycle.inbound_watch.tally.lines > 0 {
            tracing::info!(summary = %cycle.inbound_watch.tally.summary(), "watch cycle applied feed lines");
        }
        thread::sleep(Duration::from_secs(cycle.poll_interval_secs));
    }
}
