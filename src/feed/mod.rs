pub mod event;

use crate::mirror::sync::{Orchestrator, SyncOutcome};
use anyhow::{Context, Result};
use std::io::BufRead;

/// Counters for one batch of feed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedTally {
    pub lines: usize,
    pub created: usize,
    pub appended: usize,
    pub edited: usize,
    pub failed: usize,
    pub malformed: usize,
}

impl FeedTally {
    pub fn applied(&self) -> usize {
        self.created + self.appended + self.edited
    }

    pub fn absorb(&mut self, other: &FeedTally) {
        self.lines += other.lines;
        self.created += other.created;
        self.appended += other.appended;
        self.edited += other.edited;
        self.failed += other.failed;
        self.malformed += other.malformed;
    }

    pub fn summary(&self) -> String {
        format!(
            "lines={} created={} appended={} edited={} failed={} malformed={}",
            self.lines, self.created, self.appended, self.edited, self.failed, self.malformed
        )
    }
}

/// Parses and applies a single feed line. Blank lines are not counted.
pub fn apply_line(orch: &mut Orchestrator, source: &str, line_no: usize, line: &str, tally: &mut FeedTally) {
    let event = match event::parse_line(line) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(err) => {
            tally.lines += 1;
            tally.malformed += 1;
            tracing::warn!(source, line = line_no, error = %err, "skipping malformed feed line");
            return;
        }
    };
    tally.lines += 1;

    match orch.handle(&event.normalize()) {
        Ok(SyncOutcome::Created { .. }) => tally.created += 1,
        Ok(SyncOutcome::Appended { .. }) => tally.appended += 1,
        Ok(SyncOutcome::Edited { .. }) => tally.edited += 1,
        Err(_) => tally.failed += 1,
    }
}

/// Applies every line of `reader`. Undecodable bytes are replaced, so a bad
/// line is counted as malformed instead of ending the batch.
pub fn apply_reader<R: BufRead>(orch: &mut Orchestrator, source: &str, reader: R) -> Result<FeedTally> {
    let mut tally = FeedTally::default();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.with_context(|| format!("failed to read feed line {} from {source}", idx + 1))?;
        let line = String::from_utf8_lossy(&raw);
        apply_line(orch, source, idx + 1, &line, &mut tally);
    }
    Ok(tally)
}
