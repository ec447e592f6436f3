//! Follow the server log and print notifications until Ctrl+C.

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use satisbot_core::format::render;
use satisbot_core::ingest::{LogIngestor, LogTailer};
use satisbot_core::{Config, NotificationFilter, SessionTracker};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often a blocked watcher re-checks the shutdown flag
const SHUTDOWN_CHECK: Duration = Duration::from_millis(500);

pub fn run(config: &Config, path: &Path, from_start: bool, poll_ms: u64) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let tailer = if from_start {
        LogTailer::new(path)
    } else {
        LogTailer::from_end(path)
            .with_context(|| format!("failed to open {}", path.display()))?
    };

    let mut follower = Follower {
        ingestor: LogIngestor::new(tailer),
        tracker: SessionTracker::new(),
        // No server probe runs here, so the online state is never known.
        filter: NotificationFilter {
            ignore_poll_state: true,
            ..NotificationFilter::from_config(config)
        },
    };

    tracing::info!(
        path = %path.display(),
        from_start,
        polling = config.log.use_watch_file,
        "Watching server log"
    );

    // Pick up whatever is already there before waiting for changes.
    follower.drain_and_print();

    if config.log.use_watch_file {
        println!(
            "Watching {} (poll every {}ms). Press Ctrl+C to stop.",
            path.display(),
            poll_ms
        );
        watch_polling(&mut follower, &running, Duration::from_millis(poll_ms));
    } else {
        println!("Watching {}. Press Ctrl+C to stop.", path.display());
        watch_events(&mut follower, &running, path)?;
    }

    println!("Watch mode stopped.");
    tracing::info!("satisbot watch stopped");
    Ok(())
}

struct Follower {
    ingestor: LogIngestor,
    tracker: SessionTracker,
    filter: NotificationFilter,
}

impl Follower {
    /// Ingest new lines and return the chat texts they produce.
    ///
    /// A failed read is logged and yields nothing; the next call retries.
    fn drain(&mut self) -> Vec<String> {
        let result = match self.ingestor.poll() {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    path = %self.ingestor.tailer().path().display(),
                    error = %e,
                    "Failed to read server log"
                );
                eprintln!("Warning: failed to read server log: {}", e);
                return Vec::new();
            }
        };

        if result.truncated {
            println!("[{}] Log file was replaced, reading from the start", clock());
        }
        for warning in &result.warnings {
            eprintln!("Warning: {}", warning);
        }

        let mut messages = Vec::new();
        for event in &result.events {
            let Some(notification) = self.tracker.apply(event) else {
                continue;
            };
            let db = self.tracker.database();
            if !self.filter.allows(&notification, &db.server) {
                tracing::debug!(?notification, "Notification suppressed");
                continue;
            }
            messages.push(render(&notification, db, chrono::Utc::now()));
        }
        messages
    }

    fn drain_and_print(&mut self) {
        for message in self.drain() {
            println!("[{}] {}", clock(), message);
        }
    }
}

fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn watch_polling(follower: &mut Follower, running: &AtomicBool, interval: Duration) {
    while running.load(Ordering::SeqCst) {
        thread::sleep(interval);
        follower.drain_and_print();
    }
}

fn watch_events(follower: &mut Follower, running: &AtomicBool, path: &Path) -> Result<()> {
    // Watch the directory: the server recreates the file on restart.
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer =
        new_debouncer(Duration::from_millis(250), tx).context("failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    let file_name = path.file_name();

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(SHUTDOWN_CHECK) {
            Ok(Ok(events)) => {
                if events.iter().any(|e| e.path.file_name() == file_name) {
                    follower.drain_and_print();
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "File watcher error"),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
