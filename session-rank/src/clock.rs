//! Session and resampling boundaries on a fixed-offset local calendar.
//!
//! All functions are pure: they depend only on the instant passed in and the
//! [`SessionClock`] they are called on.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Length of one accounting session.
pub const SESSION_LENGTH_MS: i64 = 24 * 60 * 60 * 1000;

/// Session end is one second before the next session starts.
const SESSION_END_GAP_MS: i64 = 1000;

/// Inclusive `[start, end]` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct SessionWindow {
    pub start: i64,
    pub end: i64,
}

impl SessionWindow {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

/// Local civil calendar: a fixed UTC offset plus the hour sessions are anchored to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct SessionClock {
    utc_offset_secs: i32,
    anchor_hour: u32,
}

impl SessionClock {
    /// Callers validate `anchor_hour < 24` and `|utc_offset_secs| <= 14h`
    /// (see [`RankerConfig::validate`](crate::config::RankerConfig::validate)).
    pub fn new(utc_offset_secs: i32, anchor_hour: u32) -> Self {
        Self {
            utc_offset_secs,
            anchor_hour,
        }
    }

    pub fn anchor_hour(&self) -> u32 {
        self.anchor_hour
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// Most recently completed session before `now`.
    ///
    /// At or after today's anchor: `[anchor - 24h, anchor - 1s]`, otherwise the session
    /// before that. Always fully in the past and exactly 24h minus one second long.
    pub fn previous_session(&self, now: DateTime<Utc>) -> SessionWindow {
        let anchor = self.latest_boundary_at_or_before(now, self.anchor_hour);
        SessionWindow {
            start: anchor - SESSION_LENGTH_MS,
            end: anchor - SESSION_END_GAP_MS,
        }
    }

    /// Today's `anchor_hour` instant if `now` is at or after it, else yesterday's.
    pub fn latest_boundary_at_or_before(&self, now: DateTime<Utc>, anchor_hour: u32) -> i64 {
        let today = self.local_anchor(now, anchor_hour);
        let latest = if now >= today {
            today
        } else {
            today - TimeDelta::days(1)
        };
        latest.timestamp_millis()
    }

    /// `%Y-%m-%d` local date of an epoch-ms instant.
    pub fn local_date_label(&self, timestamp: i64) -> String {
        DateTime::from_timestamp_millis(timestamp)
            .map(|time| time.with_timezone(&self.offset()).format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Local hour-of-day of `now`.
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        use chrono::Timelike;
        now.with_timezone(&self.offset()).hour()
    }

    fn local_anchor(&self, now: DateTime<Utc>, anchor_hour: u32) -> DateTime<Utc> {
        let offset = TimeDelta::seconds(i64::from(self.utc_offset_secs));
        let local = now.naive_utc() + offset;
        let anchor_local =
            local.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(anchor_hour));
        (anchor_local - offset).and_utc()
    }
}

impl Default for SessionClock {
    /// UTC+9 calendar, sessions anchored at 05:00 local.
    fn default() -> Self {
        Self::new(9 * 3600, 5)
    }
}
