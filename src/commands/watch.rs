use anyhow::Result;

use crate::commands::CommandReport;
use crate::mirror::watcher;

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub once: bool,
    pub daemon: bool,
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");

    if opts.once && opts.daemon {
        report.issue("invalid flags: use only one of --once or --daemon");
        return Ok(report);
    }

    if opts.daemon {
        report.detail("starting watcher in daemon mode");
        watcher::run_daemon()?;
        return Ok(report);
    }

    let cycle = watcher::run_once()?;
    let inbound = &cycle.inbound_watch;
    report.detail("watcher cycle completed");
    report.detail(format!("state_file={}", cycle.state_file));
    report.detail(format!("heartbeat_epoch_secs={}", cycle.heartbeat_epoch_secs));
    report.detail(format!("poll_interval_secs={}", cycle.poll_interval_secs));
    report.detail(format!("inbound.enabled={}", inbound.enabled));
    report.detail(format!(
        "inbound.watched_paths={}",
        inbound.watched_paths.join(",")
    ));
    report.detail(format!("inbound.scanned_files={}", inbound.scanned_files));
    report.detail(format!("inbound.changed_files={}", inbound.changed_files));
    report.detail(format!("inbound.applied={}", inbound.tally.applied()));
    report.detail(format!("inbound.failed={}", inbound.tally.failed));
    report.detail(format!("inbound.malformed={}", inbound.tally.malformed));
    for event in &inbound.events {
        report.detail(format!(
            "inbound.event={} status={} message={}",
            event.file_path, event.status, event.message
        ));
    }

    Ok(report)
}
