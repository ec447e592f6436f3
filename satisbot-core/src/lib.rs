//! # satisbot-core
//!
//! Core library for satisbot - a chat notifier for Satisfactory dedicated servers.
//!
//! This library provides:
//! - Domain types for players, server state and log events
//! - The log event parser and an incremental log tailer
//! - Session reconciliation and chat message formatting
//! - The message retention (purge) engine
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Two independent flows:
//! - **Log flow:** server log lines → [`ingest::parse`] → [`SessionTracker`] → [`format::render`]
//! - **Purge flow:** channel history → [`purge::select_messages_to_purge`] → deletions
//!
//! ## Example
//!
//! ```rust
//! use satisbot_core::{ingest, SessionTracker};
//!
//! let mut tracker = SessionTracker::new();
//! let line = "[2024.01.15-12.31.00][12345]LogNet: Join succeeded: TestPlayer";
//! if let Some(event) = ingest::parse(line).expect("pattern drift") {
//!     let _ = tracker.apply(&event);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use purge::{
    select_messages_to_purge, CompleteHistory, PurgeCandidate, PurgePlan, RetentionPolicy,
};
pub use session::{NotificationFilter, SessionTracker};
pub use types::*;

// Public modules
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod purge;
pub mod session;
pub mod types;
