//! Date window for filtering events.

use chrono::{DateTime, NaiveDate, Utc};

/// Inclusive date window. Only an event's start is tested against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Default for DateWindow {
    /// Default window: everything from the Unix epoch until now
    fn default() -> Self {
        DateWindow {
            start: DateTime::<Utc>::UNIX_EPOCH,
            end: Utc::now(),
        }
    }
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateWindow { start, end }
    }

    /// Parse window bounds from command-line arguments.
    /// - `from`: YYYY-MM-DD (start of day) or RFC 3339, defaults to the Unix epoch
    /// - `to`: YYYY-MM-DD (end of day) or RFC 3339, defaults to now
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> Result<Self, String> {
        let defaults = DateWindow::default();

        let start = match from {
            Some(s) => parse_bound(s, Bound::Start)?,
            None => defaults.start,
        };

        let end = match to {
            Some(s) => parse_bound(s, Bound::End)?,
            None => defaults.end,
        };

        Ok(DateWindow { start, end })
    }

    pub fn with_start(self, start: DateTime<Utc>) -> Self {
        DateWindow { start, ..self }
    }

    pub fn with_end(self, end: DateTime<Utc>) -> Self {
        DateWindow { end, ..self }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Bound {
    Start,
    End,
}

/// Parse one window bound. Bare dates expand to the first or last second of
/// the day in UTC.
pub fn parse_bound(s: &str, bound: Bound) -> Result<DateTime<Utc>, String> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))?;

    let time = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_opt(23, 59, 59),
    };

    time.map(|t| t.and_utc())
        .ok_or_else(|| format!("Invalid date '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_args_expands_dates_to_whole_days() {
        let window = DateWindow::from_args(Some("2024-01-01"), Some("2024-01-31")).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_from_args_accepts_rfc3339() {
        let window = DateWindow::from_args(Some("2024-01-01T08:00:00+02:00"), None).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_default_start_is_epoch() {
        let window = DateWindow::from_args(None, None).unwrap();

        assert_eq!(window.start, DateTime::<Utc>::UNIX_EPOCH);
        assert!(window.end <= Utc::now());
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let err = DateWindow::from_args(Some("01/02/2024"), None).unwrap_err();

        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let window = DateWindow::new(start, end);

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(start - chrono::Duration::seconds(1)));
        assert!(!window.contains(end + chrono::Duration::seconds(1)));
    }
}
