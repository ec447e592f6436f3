//! Player session reconciliation
//!
//! [`SessionTracker`] applies decoded [`LogEvent`]s to the in-memory
//! [`Database`] in arrival order and reports the joins and departures that
//! should be announced.
//!
//! | Event | Effect |
//! |-------|--------|
//! | Log file open | Server restarted: every player goes offline silently |
//! | Command line | Recorded in the log only |
//! | Login request | Player upserted by user id; name and join attempt refreshed |
//! | Join request | Join attempt refreshed for the named player |
//! | Join succeeded | Named player goes online → [`Notification::PlayerJoined`] |
//! | Connection close | Player goes offline → [`Notification::PlayerLeft`] |
//!
//! Join succeeded lines only carry a display name, so the player is found by
//! name; on duplicates the most recent login wins.

use crate::config::Config;
use crate::types::{Database, LogEvent, Notification, Player, ProbeOutcome, ServerState};
use chrono::{DateTime, Utc};

/// Decides which notifications are actually sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    /// Drop [`Notification::ServerUnreachable`] and [`Notification::ServerFound`]
    pub disable_unreachable_found: bool,
    /// Send player notifications even while the server is not known online
    pub ignore_poll_state: bool,
}

impl NotificationFilter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            disable_unreachable_found: config.disable_unreachable_found_messages,
            ignore_poll_state: config.ignore_poll_state_when_messaging,
        }
    }

    /// Whether `notification` should be sent given the current server state.
    pub fn allows(&self, notification: &Notification, server: &ServerState) -> bool {
        match notification {
            Notification::ServerUnreachable | Notification::ServerFound => {
                !self.disable_unreachable_found
            }
            n if n.is_player_event() => self.ignore_poll_state || server.online,
            _ => true,
        }
    }
}

/// Owns the bot's view of the server and its players.
#[derive(Debug, Default)]
pub struct SessionTracker {
    db: Database,
}

impl SessionTracker {
    /// Start from an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from an existing database.
    pub fn with_database(db: Database) -> Self {
        Self { db }
    }

    /// Read-only view of the current state.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Consume the tracker and return its database.
    pub fn into_database(self) -> Database {
        self.db
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &LogEvent) -> Option<Notification> {
        match event {
            LogEvent::LogFileOpen { date } => {
                let reset = self.reset_sessions();
                tracing::info!(date = %date, players_reset = reset, "Server log reopened");
                None
            }
            LogEvent::CommandLine { command_line } => {
                tracing::debug!(command_line = %command_line, "Server command line");
                None
            }
            LogEvent::LoginRequest {
                timestamp,
                name,
                user_id,
            } => {
                let player = self
                    .db
                    .players
                    .entry(user_id.clone())
                    .or_insert_with(|| Player::new(user_id.clone(), name.clone()));
                player.name = name.clone();
                player.join_requested = timestamp.timestamp_millis();
                tracing::debug!(user_id = %user_id, name = %name, "Login request");
                None
            }
            LogEvent::JoinRequest { timestamp, name } => {
                match self.db.player_by_name_mut(name) {
                    Some(player) => player.join_requested = timestamp.timestamp_millis(),
                    None => tracing::debug!(name = %name, "Join request from unknown player"),
                }
                None
            }
            LogEvent::JoinSucceeded { timestamp, name } => self.join(name, *timestamp),
            LogEvent::ConnectionClose { timestamp, user_id } => self.leave(user_id, *timestamp),
        }
    }

    /// Apply events in order, collecting notifications.
    pub fn apply_all<'a, I>(&mut self, events: I) -> Vec<Notification>
    where
        I: IntoIterator<Item = &'a LogEvent>,
    {
        events.into_iter().filter_map(|e| self.apply(e)).collect()
    }

    /// Apply a server probe result.
    pub fn apply_probe(&mut self, outcome: ProbeOutcome) -> Option<Notification> {
        self.db.server.apply_probe(outcome)
    }

    fn join(&mut self, name: &str, at: DateTime<Utc>) -> Option<Notification> {
        let Some(player) = self.db.player_by_name_mut(name) else {
            tracing::warn!(name = %name, "Join succeeded for a player without a login request");
            return None;
        };

        // Keep `joined` strictly positive even for instants at or before the epoch.
        player.joined = at.timestamp_millis().max(1);
        player.join_time = Some(at);

        Some(Notification::PlayerJoined {
            user_id: player.user_id().to_string(),
            name: player.name.clone(),
            at,
        })
    }

    fn leave(&mut self, user_id: &str, at: DateTime<Utc>) -> Option<Notification> {
        let player = self.db.players.get_mut(user_id)?;
        if !player.is_online() {
            return None;
        }

        player.joined = 0;
        let minutes_played = player
            .join_time
            .map(|joined_at| (at - joined_at).num_minutes().max(0))
            .unwrap_or(0);

        Some(Notification::PlayerLeft {
            user_id: user_id.to_string(),
            name: player.name.clone(),
            at,
            minutes_played,
        })
    }

    fn reset_sessions(&mut self) -> usize {
        let mut reset = 0;
        for player in self.db.players.values_mut().filter(|p| p.is_online()) {
            player.joined = 0;
            reset += 1;
        }
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn login(tracker: &mut SessionTracker, user_id: &str, name: &str, when: DateTime<Utc>) {
        tracker.apply(&LogEvent::LoginRequest {
            timestamp: when,
            name: name.to_string(),
            user_id: user_id.to_string(),
        });
    }

    #[test]
    fn test_join_and_leave_cycle() {
        let mut tracker = SessionTracker::new();
        login(&mut tracker, "id-1", "Pioneer", at(12, 0));

        let joined = tracker.apply(&LogEvent::JoinSucceeded {
            timestamp: at(12, 1),
            name: "Pioneer".to_string(),
        });
        assert_eq!(
            joined,
            Some(Notification::PlayerJoined {
                user_id: "id-1".to_string(),
                name: "Pioneer".to_string(),
                at: at(12, 1),
            })
        );
        assert_eq!(tracker.database().online_players().len(), 1);

        let left = tracker.apply(&LogEvent::ConnectionClose {
            timestamp: at(13, 31),
            user_id: "id-1".to_string(),
        });
        assert_eq!(
            left,
            Some(Notification::PlayerLeft {
                user_id: "id-1".to_string(),
                name: "Pioneer".to_string(),
                at: at(13, 31),
                minutes_played: 90,
            })
        );
        assert!(tracker.database().online_players().is_empty());
    }

    #[test]
    fn test_close_for_offline_player_is_silent() {
        let mut tracker = SessionTracker::new();
        login(&mut tracker, "id-1", "Pioneer", at(12, 0));

        let event = LogEvent::ConnectionClose {
            timestamp: at(12, 5),
            user_id: "id-1".to_string(),
        };
        assert_eq!(tracker.apply(&event), None);
        assert_eq!(
            tracker.apply(&LogEvent::ConnectionClose {
                timestamp: at(12, 5),
                user_id: "unknown".to_string(),
            }),
            None
        );
    }

    #[test]
    fn test_login_renames_existing_player() {
        let mut tracker = SessionTracker::new();
        login(&mut tracker, "id-1", "Old Name", at(12, 0));
        login(&mut tracker, "id-1", "New Name", at(12, 10));

        let db = tracker.database();
        assert_eq!(db.players.len(), 1);
        assert_eq!(db.players["id-1"].name, "New Name");
        assert_eq!(db.players["id-1"].join_requested, at(12, 10).timestamp_millis());
    }

    #[test]
    fn test_join_without_login_is_ignored() {
        let mut tracker = SessionTracker::new();
        let result = tracker.apply(&LogEvent::JoinSucceeded {
            timestamp: at(12, 1),
            name: "Stranger".to_string(),
        });
        assert_eq!(result, None);
        assert!(tracker.database().players.is_empty());
    }

    #[test]
    fn test_log_file_open_resets_sessions() {
        let mut tracker = SessionTracker::new();
        login(&mut tracker, "id-1", "Pioneer", at(12, 0));
        tracker.apply(&LogEvent::JoinSucceeded {
            timestamp: at(12, 1),
            name: "Pioneer".to_string(),
        });

        let result = tracker.apply(&LogEvent::LogFileOpen {
            date: "2024.01.15-14.00.00".to_string(),
        });
        assert_eq!(result, None);
        assert!(tracker.database().online_players().is_empty());
        assert_eq!(tracker.database().players.len(), 1);
    }

    #[test]
    fn test_join_request_refreshes_attempt() {
        let mut tracker = SessionTracker::new();
        login(&mut tracker, "id-1", "Pioneer", at(12, 0));
        tracker.apply(&LogEvent::JoinRequest {
            timestamp: at(12, 2),
            name: "Pioneer".to_string(),
        });
        assert_eq!(
            tracker.database().players["id-1"].join_requested,
            at(12, 2).timestamp_millis()
        );
    }

    #[test]
    fn test_filter_player_events_follow_poll_state() {
        let joined = Notification::PlayerJoined {
            user_id: "id-1".to_string(),
            name: "Pioneer".to_string(),
            at: at(12, 0),
        };
        let mut server = ServerState::default();

        let strict = NotificationFilter::default();
        assert!(!strict.allows(&joined, &server));
        server.online = true;
        assert!(strict.allows(&joined, &server));

        let lenient = NotificationFilter {
            ignore_poll_state: true,
            ..Default::default()
        };
        assert!(lenient.allows(&joined, &ServerState::default()));
    }

    #[test]
    fn test_filter_unreachable_messages() {
        let server = ServerState::default();
        let filter = NotificationFilter {
            disable_unreachable_found: true,
            ..Default::default()
        };
        assert!(!filter.allows(&Notification::ServerUnreachable, &server));
        assert!(!filter.allows(&Notification::ServerFound, &server));
        assert!(filter.allows(&Notification::ServerOffline, &server));
        assert!(NotificationFilter::default().allows(&Notification::ServerFound, &server));
    }

    #[test]
    fn test_apply_all_collects_in_order() {
        let mut tracker = SessionTracker::new();
        let events = vec![
            LogEvent::LoginRequest {
                timestamp: at(12, 0),
                name: "A".to_string(),
                user_id: "a".to_string(),
            },
            LogEvent::LoginRequest {
                timestamp: at(12, 0),
                name: "B".to_string(),
                user_id: "b".to_string(),
            },
            LogEvent::JoinSucceeded {
                timestamp: at(12, 1),
                name: "B".to_string(),
            },
            LogEvent::JoinSucceeded {
                timestamp: at(12, 2),
                name: "A".to_string(),
            },
        ];

        let notes = tracker.apply_all(&events);
        let names: Vec<_> = notes
            .iter()
            .map(|n| match n {
                Notification::PlayerJoined { name, .. } => name.as_str(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
