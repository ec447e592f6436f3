//! Chat message formatting (Japanese)

use crate::types::{Database, Notification, Player};
use chrono::{DateTime, Utc};

/// Join player names as a Japanese "and" list, sorted case-insensitively.
pub fn format_players(players: &[&Player]) -> String {
    let mut names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
    names.sort_by_key(|name| name.to_lowercase());
    names.join("、")
}

/// Render a duration in minutes as `1日2時間3分`.
///
/// Days and hours are left out when zero; minutes are always shown.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let rest = minutes % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}日", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}時間", hours));
    }
    out.push_str(&format!("{}分", rest));
    out
}

/// Discord inline timestamp markup for an instant.
pub fn discord_timestamp(at: DateTime<Utc>) -> String {
    format!("<t:{}>", at.timestamp())
}

fn online_summary(db: &Database) -> String {
    let online = db.online_players();
    if online.is_empty() {
        "オンラインのプレイヤーはいません".to_string()
    } else {
        format!("オンライン: {}", format_players(&online))
    }
}

/// Render a notification as chat text.
///
/// `db` must already reflect the notification; `now` stamps server events,
/// which carry no instant of their own.
pub fn render(notification: &Notification, db: &Database, now: DateTime<Utc>) -> String {
    match notification {
        Notification::PlayerJoined { name, at, .. } => format!(
            "{} {}がサーバーに参加しました（{}）",
            discord_timestamp(*at),
            name,
            online_summary(db)
        ),
        Notification::PlayerLeft {
            name,
            at,
            minutes_played,
            ..
        } => format!(
            "{} {}がサーバーから退出しました（プレイ時間: {}、{}）",
            discord_timestamp(*at),
            name,
            format_minutes(*minutes_played),
            online_summary(db)
        ),
        Notification::ServerOnline { version } => {
            if version.is_empty() {
                format!("{} サーバーが起動しました", discord_timestamp(now))
            } else {
                format!(
                    "{} サーバーが起動しました（バージョン: {}）",
                    discord_timestamp(now),
                    version
                )
            }
        }
        Notification::ServerOffline => {
            format!("{} サーバーが停止しました", discord_timestamp(now))
        }
        Notification::ServerUnreachable => {
            format!("{} サーバーに接続できません", discord_timestamp(now))
        }
        Notification::ServerFound => {
            format!("{} サーバーへの接続が回復しました", discord_timestamp(now))
        }
        Notification::VersionChanged { from, to } => format!(
            "{} サーバーのバージョンが{}から{}に更新されました",
            discord_timestamp(now),
            from,
            to
        ),
    }
}
