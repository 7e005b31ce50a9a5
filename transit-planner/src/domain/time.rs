//! Service-day time handling.
//!
//! Static feeds express schedule times as offsets from the local midnight of
//! the service day, written `HH:MM:SS`. Hours may exceed 23 for trips that run
//! past midnight, so a `ServiceTime` is a plain second count rather than a
//! time of day.

use std::fmt;
use std::ops::Add;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid schedule time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service time {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Seconds since local midnight of a service day.
///
/// # Examples
///
/// ```
/// use transit_planner::domain::ServiceTime;
///
/// let t = ServiceTime::parse("25:10:00").unwrap();
/// assert_eq!(t.seconds(), 25 * 3600 + 600);
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Create a time from a number of seconds since midnight.
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Create a time from hours, minutes and seconds.
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Parse `H:MM:SS` or `HH:MM:SS`. Hours are not capped at 23.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let trimmed = s.trim();
        let mut parts = trimmed.split(':');

        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new(s, "expected HH:MM:SS"));
        };

        let hours: u32 = h
            .parse()
            .map_err(|_| TimeError::new(s, "invalid hour digits"))?;
        let minutes: u32 = m
            .parse()
            .map_err(|_| TimeError::new(s, "invalid minute digits"))?;
        let seconds: u32 = sec
            .parse()
            .map_err(|_| TimeError::new(s, "invalid second digits"))?;

        if m.len() != 2 || sec.len() != 2 {
            return Err(TimeError::new(s, "minutes and seconds need two digits"));
        }
        if minutes > 59 || seconds > 59 {
            return Err(TimeError::new(s, "minutes and seconds must be 0-59"));
        }

        Ok(Self::from_hms(hours, minutes, seconds))
    }

    /// Returns the number of seconds since midnight.
    pub fn seconds(&self) -> u32 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn saturating_since(&self, earlier: ServiceTime) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    /// The time of day of `instant` as seconds since its local midnight.
    pub fn of_instant(instant: &DateTime<FixedOffset>) -> Self {
        Self(instant.time().num_seconds_from_midnight())
    }

    /// Resolve this time against a service day in a fixed UTC offset.
    pub fn on(&self, date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
        service_midnight(date, offset) + Duration::seconds(i64::from(self.0))
    }
}

impl Add<u32> for ServiceTime {
    type Output = ServiceTime;

    fn add(self, seconds: u32) -> ServiceTime {
        ServiceTime(self.0.saturating_add(seconds))
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

/// Local midnight of `date` in `offset`.
pub fn service_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(chrono::NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}
