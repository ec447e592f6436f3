//! Fetching channel history and carrying out a purge

use super::{select_messages_to_purge, PurgeCandidate, RetentionPolicy};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Maximum number of messages requested per history page.
pub const PAGE_LIMIT: usize = 100;

/// Chat transport operations needed by a purge run.
///
/// Implementations wrap a chat client; the purge logic never talks to the
/// network itself.
pub trait PurgeChannel {
    /// Human-readable channel label for logs
    fn label(&self) -> String;

    /// Fetch up to `limit` messages older than `before` (or the newest
    /// messages when `before` is `None`), newest first.
    fn fetch_before(&mut self, before: Option<&str>, limit: usize) -> Result<Vec<PurgeCandidate>>;

    /// Delete one message.
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// The full, unfiltered message history of one channel.
///
/// Holding one of these asserts that nothing was left out. Build it with
/// [`fetch_complete_history`], or with [`CompleteHistory::assume_complete`]
/// when the caller already has every message (exports, tests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteHistory(Vec<PurgeCandidate>);

impl CompleteHistory {
    /// Wrap messages the caller guarantees to be the whole history.
    pub fn assume_complete(messages: Vec<PurgeCandidate>) -> Self {
        Self(messages)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PurgeCandidate> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<PurgeCandidate> {
        self.0
    }
}

/// Page backwards through a channel until an empty page comes back.
pub fn fetch_complete_history<C>(channel: &mut C) -> Result<CompleteHistory>
where
    C: PurgeChannel + ?Sized,
{
    let mut messages = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = channel.fetch_before(cursor.as_deref(), PAGE_LIMIT)?;
        let Some(last) = page.last() else {
            break;
        };

        if cursor.as_deref() == Some(last.id.as_str()) {
            return Err(Error::Pagination(format!(
                "history cursor did not advance past message {} in {}",
                last.id,
                channel.label()
            )));
        }

        cursor = Some(last.id.clone());
        messages.extend(page);
    }

    tracing::debug!(channel = %channel.label(), count = messages.len(), "Fetched channel history");
    Ok(CompleteHistory(messages))
}

/// Outcome of one purge run.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Messages fetched from the channel
    pub fetched: usize,
    /// Self-authored messages among them
    pub self_authored: usize,
    /// Messages selected for deletion
    pub selected: usize,
    /// Messages deleted successfully
    pub deleted: usize,
    /// Failed deletions (message id → error message)
    pub failures: Vec<(String, String)>,
}

/// Fetch, select and delete for one channel.
///
/// Taking the channel by `&mut` keeps two runs on the same channel from
/// overlapping. Individual deletion failures are logged and reported but
/// neither retried nor allowed to stop the rest of the batch.
pub fn run_purge<C>(
    channel: &mut C,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<PurgeReport>
where
    C: PurgeChannel + ?Sized,
{
    let history = fetch_complete_history(channel)?;
    let plan = select_messages_to_purge(&history, policy, now);

    let mut report = PurgeReport {
        fetched: history.len(),
        self_authored: plan.self_authored,
        selected: plan.selected.len(),
        ..Default::default()
    };

    if plan.selected.is_empty() {
        tracing::debug!(channel = %channel.label(), "Nothing to purge");
        return Ok(report);
    }

    tracing::info!(
        channel = %channel.label(),
        selected = plan.selected.len(),
        self_authored = plan.self_authored,
        "Purging messages"
    );

    for id in &plan.selected {
        match channel.delete(id) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                tracing::warn!(
                    channel = %channel.label(),
                    message_id = %id,
                    error = %e,
                    "Failed to delete message"
                );
                report.failures.push((id.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}
