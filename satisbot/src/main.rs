//! satisbot - Satisfactory dedicated server notifier
//!
//! Tails the server's console log, tracks who is online and prints the chat
//! notifications the bot would send. Also plans channel history purges.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/satisbot/config.toml (~/.config/satisbot/config.toml)
//! - Logs: $XDG_STATE_HOME/satisbot/satisbot.log (~/.local/state/satisbot/satisbot.log)

mod watch;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use satisbot_core::config::LoggingConfig;
use satisbot_core::purge::next_purge;
use satisbot_core::{
    ingest, select_messages_to_purge, CompleteHistory, Config, PurgeCandidate, RetentionPolicy,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "satisbot")]
#[command(about = "Satisfactory dedicated server notifier")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SATISBOT_CONFIG or ~/.config/satisbot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a log file (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a server log file into JSON lines
    Parse {
        /// Log file to decode
        file: PathBuf,
    },

    /// Follow the server log and print notifications
    Watch {
        /// Log file to follow (defaults to log.location)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Replay the existing content instead of starting at the end
        #[arg(long)]
        from_start: bool,

        /// Poll interval in milliseconds when polling the file
        #[arg(long, default_value = "1000")]
        poll: u64,
    },

    /// Print the ids of messages a purge would delete
    PurgePlan {
        /// Exported channel history: JSON array of {id, authorIsSelf, createdAt}
        #[arg(long)]
        history: PathBuf,

        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,

        /// Override purge.after_days
        #[arg(long, allow_negative_numbers = true)]
        after_days: Option<i64>,

        /// Override purge.after_lines
        #[arg(long, allow_negative_numbers = true)]
        after_lines: Option<i64>,
    },

    /// Print when the next scheduled purge runs
    NextPurge {
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 instant: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard = if cli.verbose > 0 {
        let logging = LoggingConfig {
            level: if cli.verbose >= 2 { "trace" } else { "debug" }.to_string(),
            max_files: config.logging.max_files,
        };
        Some(satisbot_core::logging::init(&logging).context("failed to initialize logging")?)
    } else {
        None
    };

    tracing::info!("satisbot starting");

    match cli.command {
        Command::Parse { file } => run_parse(&file),
        Command::Watch {
            log,
            from_start,
            poll,
        } => {
            let path = match log.or_else(|| config.log.location.clone()) {
                Some(path) => path,
                None => bail!("no log file to watch: pass --log or set log.location"),
            };
            watch::run(&config, &path, from_start, poll)
        }
        Command::PurgePlan {
            history,
            now,
            after_days,
            after_lines,
        } => {
            let policy = RetentionPolicy::new(
                after_days.unwrap_or(config.purge.after_days),
                after_lines.unwrap_or(config.purge.after_lines),
            );
            run_purge_plan(&history, &policy, now.unwrap_or_else(Utc::now))
        }
        Command::NextPurge { now } => {
            let now = now.unwrap_or_else(Utc::now);
            println!("{}", next_purge(now, config.purge.hour).to_rfc3339());
            if !config.purge.is_enabled() {
                eprintln!(
                    "Purging is disabled: purge.after_days and purge.after_lines are both negative"
                );
            }
            Ok(())
        }
    }
}

/// Decode a whole log file, printing one JSON event per line
fn run_parse(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let result = ingest::parse_lines(content.lines(), 1);

    for event in &result.events {
        println!(
            "{}",
            serde_json::to_string(event).context("failed to encode event")?
        );
    }
    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }

    tracing::info!(
        path = %file.display(),
        lines = result.lines_read,
        events = result.events.len(),
        warnings = result.warnings.len(),
        "Parsed log file"
    );

    Ok(())
}

/// Evaluate the retention policy against an exported history
fn run_purge_plan(history: &Path, policy: &RetentionPolicy, now: DateTime<Utc>) -> Result<()> {
    let content = std::fs::read_to_string(history)
        .with_context(|| format!("failed to read {}", history.display()))?;
    let messages: Vec<PurgeCandidate> =
        serde_json::from_str(&content).context("failed to parse history JSON")?;
    let total = messages.len();

    // An export is the whole channel by construction.
    let history = CompleteHistory::assume_complete(messages);
    let plan = select_messages_to_purge(&history, policy, now);

    for id in &plan.selected {
        println!("{}", id);
    }
    eprintln!(
        "{} of {} messages selected ({} self-authored, {} retained)",
        plan.selected.len(),
        total,
        plan.self_authored,
        plan.retained
    );

    tracing::info!(
        selected = plan.selected.len(),
        self_authored = plan.self_authored,
        retained = plan.retained,
        "Purge plan computed"
    );

    Ok(())
}
