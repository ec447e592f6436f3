//! Chat history retention
//!
//! The bot keeps its notification channel tidy by deleting its own old
//! messages. This module decides *which* messages go; fetching and deleting
//! belong to a [`PurgeChannel`] implementation supplied by the caller.
//!
//! ## Selection rule
//!
//! Only self-authored messages are candidates. They are ranked newest first;
//! the message at rank `i` is selected when either
//!
//! - `i >= after_lines` (outside the retained-count window), or
//! - it was created more than `after_days` days before `now`.
//!
//! `after_days < 0` switches the age check off. `after_lines <= 0` selects
//! every candidate by count. A policy where both are negative purges nothing.
//!
//! ## Complete history
//!
//! Selection is only correct over the channel's *entire* history: a truncated
//! history undercounts the retained window and misses old messages. The
//! engine therefore takes a [`CompleteHistory`], which is normally produced
//! by [`fetch_complete_history`].

mod history;
mod schedule;

pub use history::{
    fetch_complete_history, run_purge, CompleteHistory, PurgeChannel, PurgeReport, PAGE_LIMIT,
};
pub use schedule::next_purge;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Retention thresholds for the bot's own messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep messages younger than this many days (negative disables)
    pub after_days: i64,
    /// Keep this many of the newest messages
    pub after_lines: i64,
}

impl RetentionPolicy {
    pub fn new(after_days: i64, after_lines: i64) -> Self {
        Self {
            after_days,
            after_lines,
        }
    }

    /// Whether this policy can ever select anything.
    pub fn will_purge(&self) -> bool {
        self.after_days >= 0 || self.after_lines >= 0
    }

    /// Messages created strictly before this instant are too old.
    ///
    /// `None` when the age check is disabled or the window reaches past the
    /// representable range.
    fn age_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.after_days < 0 {
            return None;
        }
        let window = Duration::milliseconds(self.after_days.saturating_mul(MS_PER_DAY));
        now.checked_sub_signed(window)
    }
}

/// A fetched chat message, reduced to what retention needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeCandidate {
    pub id: String,
    pub author_is_self: bool,
    pub created_at: DateTime<Utc>,
}

/// The engine's decision for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgePlan {
    /// Ids to delete, unique, newest first
    pub selected: Vec<String>,
    /// Number of self-authored messages considered
    pub self_authored: usize,
    /// Self-authored messages that survive
    pub retained: usize,
}

/// Decide which of the bot's messages must be deleted.
///
/// Pure: the result depends only on the arguments.
pub fn select_messages_to_purge(
    history: &CompleteHistory,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> PurgePlan {
    let mut own: Vec<&PurgeCandidate> = history.iter().filter(|m| m.author_is_self).collect();
    own.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut plan = PurgePlan {
        self_authored: own.len(),
        ..Default::default()
    };

    if !policy.will_purge() {
        plan.retained = own.len();
        return plan;
    }

    let cutoff = policy.age_cutoff(now);
    let mut seen = HashSet::new();

    for (rank, message) in own.iter().enumerate() {
        let over_count = rank as i64 >= policy.after_lines;
        let too_old = cutoff.map_or(false, |c| message.created_at < c);

        if over_count || too_old {
            if seen.insert(message.id.as_str()) {
                plan.selected.push(message.id.clone());
            }
        } else {
            plan.retained += 1;
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap()
    }

    fn message(id: &str, own: bool, days_old: i64) -> PurgeCandidate {
        PurgeCandidate {
            id: id.to_string(),
            author_is_self: own,
            created_at: now() - Duration::days(days_old),
        }
    }

    fn history(messages: Vec<PurgeCandidate>) -> CompleteHistory {
        CompleteHistory::assume_complete(messages)
    }

    #[test]
    fn test_count_boundary_keeps_newest() {
        let h = history(vec![
            message("m4", true, 4),
            message("m0", true, 0),
            message("m2", true, 2),
            message("m1", true, 1),
            message("m3", true, 3),
        ]);

        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(-1, 3), now());
        assert_eq!(plan.selected, vec!["m3", "m4"]);
        assert_eq!(plan.self_authored, 5);
        assert_eq!(plan.retained, 3);
    }

    #[test]
    fn test_age_boundary() {
        let h = history(vec![
            message("new", true, 0),
            message("mid", true, 10),
            message("old", true, 40),
        ]);

        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(30, 1000), now());
        assert_eq!(plan.selected, vec!["old"]);
    }

    #[test]
    fn test_exactly_at_cutoff_is_kept() {
        let h = history(vec![message("edge", true, 30)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(30, 1000), now());
        assert!(plan.selected.is_empty());
    }

    #[test]
    fn test_other_authors_never_selected() {
        let h = history(vec![
            message("human-old", false, 400),
            message("human-new", false, 0),
            message("bot", true, 400),
        ]);

        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(0, 0), now());
        assert_eq!(plan.selected, vec!["bot"]);
        assert_eq!(plan.self_authored, 1);
    }

    #[test]
    fn test_union_selects_each_once() {
        // "old" is both beyond the count window and past the age window.
        let h = history(vec![message("new", true, 0), message("old", true, 40)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(30, 1), now());
        assert_eq!(plan.selected, vec!["old"]);
    }

    #[test]
    fn test_duplicate_ids_selected_once() {
        let h = history(vec![message("dup", true, 40), message("dup", true, 40)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(30, 1000), now());
        assert_eq!(plan.selected, vec!["dup"]);
    }

    #[test]
    fn test_zero_lines_selects_everything() {
        let h = history(vec![message("a", true, 0), message("b", true, 1)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(-1, 0), now());
        assert_eq!(plan.selected, vec!["a", "b"]);
        assert_eq!(plan.retained, 0);
    }

    #[test]
    fn test_negative_lines_with_age_limit_selects_everything() {
        let policy = RetentionPolicy::new(30, -1);
        assert!(policy.will_purge());

        let h = history(vec![
            message("today", true, 0),
            message("last-week", true, 7),
            message("old", true, 40),
            message("human", false, 40),
        ]);
        let plan = select_messages_to_purge(&h, &policy, now());
        assert_eq!(plan.selected, vec!["today", "last-week", "old"]);
        assert_eq!(plan.retained, 0);
    }

    #[test]
    fn test_negative_days_does_not_purge_by_age() {
        let h = history(vec![message("ancient", true, 10_000)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(-1, 5), now());
        assert!(plan.selected.is_empty());
    }

    #[test]
    fn test_both_negative_purges_nothing() {
        let policy = RetentionPolicy::new(-1, -1);
        assert!(!policy.will_purge());

        let h = history(vec![message("a", true, 400), message("b", true, 0)]);
        let plan = select_messages_to_purge(&h, &policy, now());
        assert!(plan.selected.is_empty());
        assert_eq!(plan.retained, 2);
    }

    #[test]
    fn test_huge_day_window_does_not_overflow() {
        let h = history(vec![message("a", true, 400)]);
        let plan = select_messages_to_purge(&h, &RetentionPolicy::new(i64::MAX, 10), now());
        assert!(plan.selected.is_empty());
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut messages = vec![
            message("a", true, 0),
            message("b", true, 5),
            message("c", true, 50),
            message("d", true, 9),
        ];
        let policy = RetentionPolicy::new(30, 2);
        let forward = select_messages_to_purge(&history(messages.clone()), &policy, now());
        messages.reverse();
        let backward = select_messages_to_purge(&history(messages), &policy, now());

        let mut f = forward.selected.clone();
        let mut b = backward.selected.clone();
        f.sort();
        b.sort();
        assert_eq!(f, b);
        assert_eq!(f, vec!["c", "d"]);
    }

    #[test]
    fn test_candidate_json_shape() {
        let json = r#"{"id":"123","authorIsSelf":true,"createdAt":"2024-05-01T00:00:00Z"}"#;
        let candidate: PurgeCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id, "123");
        assert!(candidate.author_is_self);
        assert_eq!(
            candidate.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }
}
