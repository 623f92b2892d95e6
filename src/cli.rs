use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;
use crate::mirror::config::load_config;

#[derive(Parser)]
#[command(name = "chat-mirror", version)]
#[command(about = "Mirror a live chat feed into an export-style HTML archive", long_about = None)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the archive layout and an empty index page
    Init,
    /// Apply feed events from a JSON-lines file, or stdin
    Ingest {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Tail the inbound feed directories
    Watch {
        #[arg(long)]
        once: bool,
        #[arg(long)]
        daemon: bool,
    },
    /// Regenerate all pages from the structured stores
    Render,
    /// Show paths, configuration and archive totals
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = load_config()
        .map(|cfg| cfg.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    logging::init(&level);

    let report = match cli.command {
        Command::Init => commands::init::run()?,
        Command::Ingest { file } => {
            commands::ingest::run(&commands::ingest::IngestOptions { file })?
        }
        Command::Watch { once, daemon } => {
            commands::watch::run(&commands::watch::WatchOptions { once, daemon })?
        }
        Command::Render => commands::render::run()?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        bail!(
            "{} reported {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
