//! Core domain types for satisbot
//!
//! These types describe what the bot knows about the dedicated server and
//! its players, and the typed events decoded from the server's console log.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Player** | One distinct player identity, keyed by the server-issued user id |
//! | **ServerState** | What the last probe said about the server (version, online, unreachable) |
//! | **Database** | Aggregate root: the server state plus every known player |
//! | **LogEvent** | A typed record decoded from one console log line |
//! | **Notification** | A state change worth telling the chat channel about |
//!
//! ### Online players
//!
//! A player is online when [`Player::joined`] is greater than zero. The
//! session tracker stores the join instant (epoch milliseconds) there, but
//! consumers must only rely on "greater than zero".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Players
// ============================================

/// One record per distinct player identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Stable opaque identifier, fixed at creation
    user_id: String,
    /// Most recently observed display name
    pub name: String,
    /// Epoch milliseconds of the most recent join attempt (0 if none seen)
    pub join_requested: i64,
    /// 0 when offline, greater than zero while a session is active
    pub joined: i64,
    /// Instant of the most recent successful join
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub join_time: Option<DateTime<Utc>>,
}

impl Player {
    /// Create an offline player record.
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            join_requested: 0,
            joined: 0,
            join_time: None,
        }
    }

    /// The player's immutable identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether the player currently has an active session.
    pub fn is_online(&self) -> bool {
        self.joined > 0
    }
}

// ============================================
// Server
// ============================================

/// What the bot currently knows about the monitored server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    /// Reported server version (empty when unknown)
    pub version: String,
    /// Server process is up
    pub online: bool,
    /// Server is up but not answering queries
    pub unreachable: bool,
}

/// Result of one server query probe, as reported by the probing collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered the query
    Responded { version: String },
    /// The server is believed up but did not answer in time
    Unreachable,
    /// The server is down
    Offline,
}

impl ServerState {
    /// Apply a probe result, returning the notification for the transition (if any).
    pub fn apply_probe(&mut self, outcome: ProbeOutcome) -> Option<Notification> {
        match outcome {
            ProbeOutcome::Responded { version } => {
                let was_online = self.online;
                let was_unreachable = self.unreachable;
                let previous = std::mem::replace(&mut self.version, version.clone());
                self.online = true;
                self.unreachable = false;

                if was_unreachable {
                    Some(Notification::ServerFound)
                } else if !was_online {
                    Some(Notification::ServerOnline { version })
                } else if previous != version {
                    Some(Notification::VersionChanged {
                        from: previous,
                        to: version,
                    })
                } else {
                    None
                }
            }
            ProbeOutcome::Unreachable => {
                if self.unreachable {
                    return None;
                }
                self.unreachable = true;
                Some(Notification::ServerUnreachable)
            }
            ProbeOutcome::Offline => {
                let changed = self.online || self.unreachable;
                self.online = false;
                self.unreachable = false;
                changed.then_some(Notification::ServerOffline)
            }
        }
    }
}

// ============================================
// Database
// ============================================

/// Aggregate root: one server state plus all known players keyed by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub server: ServerState,
    pub players: HashMap<String, Player>,
}

impl Database {
    /// Players with an active session, sorted by name (case-insensitive).
    pub fn online_players(&self) -> Vec<&Player> {
        let mut online: Vec<&Player> = self.players.values().filter(|p| p.is_online()).collect();
        online.sort_by_key(|p| p.name.to_lowercase());
        online
    }

    /// Find the player with the given display name.
    ///
    /// Names are not unique; when several records share a name the one with
    /// the most recent join attempt wins.
    pub fn player_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players
            .values_mut()
            .filter(|p| p.name == name)
            .max_by_key(|p| p.join_requested)
    }
}

// ============================================
// Log events
// ============================================

/// The six kinds of log line the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEventKind {
    LogFileOpen,
    CommandLine,
    LoginRequest,
    JoinRequest,
    JoinSucceeded,
    ConnectionClose,
}

impl LogEventKind {
    /// Returns the tag used in serialized events
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEventKind::LogFileOpen => "Log file open",
            LogEventKind::CommandLine => "Command line",
            LogEventKind::LoginRequest => "Login request",
            LogEventKind::JoinRequest => "Join request",
            LogEventKind::JoinSucceeded => "Join succeeded",
            LogEventKind::ConnectionClose => "Connection close",
        }
    }
}

impl std::fmt::Display for LogEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed record decoded from one server log line.
///
/// Every field is present and already normalized; timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LogEvent {
    /// `Log file open, <date>`: the server (re)started and opened a fresh log
    #[serde(rename = "Log file open")]
    LogFileOpen { date: String },

    /// `LogInit: Command Line: <args>`
    #[serde(rename = "Command line", rename_all = "camelCase")]
    CommandLine { command_line: String },

    /// A client asked to log in with its user id
    #[serde(rename = "Login request", rename_all = "camelCase")]
    LoginRequest {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        name: String,
        user_id: String,
    },

    /// A logged-in client asked to join the world
    #[serde(rename = "Join request", rename_all = "camelCase")]
    JoinRequest {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        name: String,
    },

    /// A client finished joining
    #[serde(rename = "Join succeeded", rename_all = "camelCase")]
    JoinSucceeded {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        name: String,
    },

    /// A client connection was closed
    #[serde(rename = "Connection close", rename_all = "camelCase")]
    ConnectionClose {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        user_id: String,
    },
}

impl LogEvent {
    /// The event's kind tag.
    pub fn kind(&self) -> LogEventKind {
        match self {
            LogEvent::LogFileOpen { .. } => LogEventKind::LogFileOpen,
            LogEvent::CommandLine { .. } => LogEventKind::CommandLine,
            LogEvent::LoginRequest { .. } => LogEventKind::LoginRequest,
            LogEvent::JoinRequest { .. } => LogEventKind::JoinRequest,
            LogEvent::JoinSucceeded { .. } => LogEventKind::JoinSucceeded,
            LogEvent::ConnectionClose { .. } => LogEventKind::ConnectionClose,
        }
    }

    /// The normalized line timestamp, for kinds that carry one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            LogEvent::LogFileOpen { .. } | LogEvent::CommandLine { .. } => None,
            LogEvent::LoginRequest { timestamp, .. }
            | LogEvent::JoinRequest { timestamp, .. }
            | LogEvent::JoinSucceeded { timestamp, .. }
            | LogEvent::ConnectionClose { timestamp, .. } => Some(*timestamp),
        }
    }
}

// ============================================
// Notifications
// ============================================

/// A state change that should be announced in the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A player finished joining
    PlayerJoined {
        user_id: String,
        name: String,
        at: DateTime<Utc>,
    },
    /// A player with an active session disconnected
    PlayerLeft {
        user_id: String,
        name: String,
        at: DateTime<Utc>,
        minutes_played: i64,
    },
    /// The server started answering queries
    ServerOnline { version: String },
    /// The server went down
    ServerOffline,
    /// The server stopped answering queries
    ServerUnreachable,
    /// The server answers queries again after being unreachable
    ServerFound,
    /// The server came back with a different version
    VersionChanged { from: String, to: String },
}

impl Notification {
    /// Whether this notification concerns a player rather than the server.
    pub fn is_player_event(&self) -> bool {
        matches!(
            self,
            Notification::PlayerJoined { .. } | Notification::PlayerLeft { .. }
        )
    }
}
