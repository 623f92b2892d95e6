use anyhow::Result;

use crate::commands::{CommandReport, open_orchestrator};
use crate::mirror::config::load_config;
use crate::mirror::paths::resolve_paths;
use crate::mirror::sync::archive_exists;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("init");

    let existed = archive_exists(&paths);
    let orch = open_orchestrator(&paths, &cfg)?;
    orch.index().flush()?;

    report.detail(format!("archive_dir={}", paths.archive_dir.display()));
    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("chats_dir={}", paths.chats_dir.display()));
    report.detail(format!("inbound_dir={}", paths.inbound_dir.display()));
    if existed {
        report.detail(format!(
            "archive already initialized; conversations={}",
            orch.index().entries().len()
        ));
    } else {
        report.detail("archive initialized");
    }
    Ok(report)
}
