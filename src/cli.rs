use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "aegis",
    version,
    about = "AEGIS wellbeing coach: moderated AI chat turns, history, and therapist summaries"
)]
struct Cli {
    /// Emit the command report as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one moderated chat turn for an owner.
    Chat {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        text: String,
        /// PRIVATE or SHARED; defaults to the owner's stored consent mode.
        #[arg(long)]
        mode: Option<String>,
    },
    /// List persisted chat records for an owner, oldest first.
    History {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List persisted therapist summaries for an owner, newest first.
    Summaries {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show or change an owner's consent mode.
    Mode {
        #[arg(long)]
        owner: String,
        /// New mode (PRIVATE or SHARED); omit to just print the current one.
        #[arg(long)]
        set: Option<String>,
    },
    /// Report configuration, storage layout, and environment problems.
    Doctor,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Chat { owner, text, mode } => commands::chat::run(&commands::chat::ChatOptions {
            owner,
            text,
            mode,
        })?,
        Command::History { owner, limit } => commands::history::run(&owner, limit)?,
        Command::Summaries { owner, limit } => commands::summaries::run(&owner, limit)?,
        Command::Mode { owner, set } => commands::mode::run(&owner, set.as_deref())?,
        Command::Doctor => commands::doctor::run()?,
    };

    render(&report, cli.json)?;

    if report.ok {
        Ok(())
    } else {
        Err(anyhow!(
            "command `{}` reported {} issue(s)",
            report.command,
            report.issues.len()
        ))
    }
}
