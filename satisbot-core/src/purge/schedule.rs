//! When the daily purge runs

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// The next purge instant: the upcoming UTC midnight after `now`, plus `hour` hours.
///
/// At exactly midnight the *following* midnight is used, so a run that
/// finishes instantly never schedules itself for the same moment.
pub fn next_purge(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::default()).and_utc();
    midnight + Duration::days(1) + Duration::hours(i64::from(hour))
}
