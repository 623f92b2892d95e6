use anyhow::Result;

use crate::commands::{CommandReport, open_orchestrator};
use crate::mirror::audit;
use crate::mirror::config::load_config;
use crate::mirror::paths::resolve_paths;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("render");

    let orch = open_orchestrator(&paths, &cfg)?;
    let summary = orch.render_all()?;

    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("conversations_rendered={}", summary.rendered));
    for folder in &summary.failed {
        report.issue(format!("conversation journal unreadable: {folder}"));
    }

    audit::append_event(
        &paths,
        "render",
        if summary.failed.is_empty() { "ok" } else { "degraded" },
        &format!(
            "rendered={} failed={}",
            summary.rendered,
            summary.failed.len()
        ),
    )?;
    Ok(report)
}
