//! Event time types.
//!
//! Feeds encode DTSTART/DTEND in several ways. `EventTime` keeps the encoding
//! as written so the conversion to an absolute instant happens in one place.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A DTSTART/DTEND value as it appeared in the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`)
    Date(NaiveDate),
    /// UTC value (`Z` suffix)
    DateTimeUtc(DateTime<Utc>),
    /// Local time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Local time qualified with a `TZID` parameter
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    /// Resolve to an absolute UTC instant.
    ///
    /// Dates resolve to local midnight. Floating times and zoned times whose
    /// TZID is not a known IANA name are read in `floating_tz`. Returns `None`
    /// when the local time does not exist in the zone (DST gap).
    pub fn to_utc(&self, floating_tz: Tz) -> Option<DateTime<Utc>> {
        match self {
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::Date(d) => resolve_local(&d.and_hms_opt(0, 0, 0)?, floating_tz),
            EventTime::DateTimeFloating(naive) => resolve_local(naive, floating_tz),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let tz = tzid.parse::<Tz>().unwrap_or(floating_tz);
                resolve_local(datetime, tz)
            }
        }
    }
}

fn resolve_local(naive: &NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// The span of one scheduled event.
///
/// `end` may precede `start` when the feed is malformed; such an interval
/// yields a negative duration rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        EventInterval { start, end }
    }

    /// Signed length in fractional hours.
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }
}
