use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::commands::{CommandReport, open_orchestrator};
use crate::feed;
use crate::mirror::audit;
use crate::mirror::config::load_config;
use crate::mirror::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub file: Option<PathBuf>,
}

pub fn run(opts: &IngestOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("ingest");
    let mut orch = open_orchestrator(&paths, &cfg)?;

    let (source, tally) = match &opts.file {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let source = path.display().to_string();
            let tally = feed::apply_reader(&mut orch, &source, BufReader::new(file))?;
            (source, tally)
        }
        None => {
            let stdin = io::stdin();
            let tally = feed::apply_reader(&mut orch, "stdin", stdin.lock())?;
            ("stdin".to_string(), tally)
        }
    };

    let status = if tally.failed + tally.malformed == 0 {
        "ok"
    } else {
        "degraded"
    };
    audit::append_event(
        &paths,
        "ingest",
        status,
        &format!("source={source} {}", tally.summary()),
    )?;

    report.detail(format!("source={source}"));
    report.detail(format!("lines={}", tally.lines));
    report.detail(format!("created={}", tally.created));
    report.detail(format!("appended={}", tally.appended));
    report.detail(format!("edited={}", tally.edited));
    report.detail(format!("conversations={}", orch.index().entries().len()));
    if tally.failed > 0 {
        report.issue(format!("{} event(s) could not be applied", tally.failed));
    }
    if tally.malformed > 0 {
        report.issue(format!("{} malformed line(s) skipped", tally.malformed));
    }
    Ok(report)
}
