use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::mirror::config::load_config;
use crate::mirror::index::ArchiveIndex;
use crate::mirror::paths::resolve_paths;
use crate::mirror::sync::{ArchiveSettings, archive_exists};

include!(concat!(env!("OUT_DIR"), "/mirror_env_allowlist.rs"));

/// `MIRROR_*` variables this build reads that are currently set.
pub fn recognised_env_vars() -> Vec<&'static str> {
    GENERATED_MIRROR_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some())
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("mirror_home={}", paths.mirror_home.display()));
    report.detail(format!("archive_dir={}", paths.archive_dir.display()));
    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("inbound_dir={}", paths.inbound_dir.display()));
    report.detail(format!("config.name_match={}", cfg.archive.name_match));
    report.detail(format!("config.chat_kind={}", cfg.archive.chat_kind));
    report.detail(format!("config.escape_markup={}", cfg.archive.escape_markup));
    report.detail(format!("config.display_zone={}", cfg.display_zone()?.label()));
    report.detail(format!(
        "config.poll_interval_secs={}",
        cfg.watcher.poll_interval_secs
    ));
    report.detail(format!("env.recognised={}", recognised_env_vars().join(",")));

    if !archive_exists(&paths) {
        report.issue(format!(
            "archive not initialized at {} (run `chat-mirror init`)",
            paths.archive_dir.display()
        ));
        return Ok(report);
    }

    let settings = ArchiveSettings::from_config(&cfg)?;
    let index = ArchiveIndex::open(
        &paths,
        settings.index_shell,
        settings.name_match,
        settings.render,
    )?;
    let messages: u64 = index.entries().iter().map(|e| e.message_count).sum();
    report.detail(format!("conversations={}", index.entries().len()));
    report.detail(format!("messages={messages}"));
    if paths.lock_file().exists() {
        report.detail(format!("lock_file={}", paths.lock_file().display()));
    }
    Ok(report)
}
