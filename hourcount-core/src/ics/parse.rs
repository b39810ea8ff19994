//! Feed parsing using the icalendar crate's parser.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{HoursError, HoursResult};
use crate::event::{EventInterval, EventTime};

/// An event that was skipped because its times could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct EventParseFailure {
    /// SUMMARY, else UID, else the event's position in the feed
    pub label: String,
    pub reason: String,
}

/// The usable intervals of a feed plus the events that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub intervals: Vec<EventInterval>,
    pub failures: Vec<EventParseFailure>,
}

/// Turns feed text into event intervals.
#[derive(Debug, Clone, Copy)]
pub struct FeedParser {
    floating_tz: Tz,
}

impl Default for FeedParser {
    fn default() -> Self {
        FeedParser { floating_tz: Tz::UTC }
    }
}

impl FeedParser {
    /// `floating_tz` is used for date-only values, floating times and
    /// unrecognised TZIDs.
    pub fn new(floating_tz: Tz) -> Self {
        FeedParser { floating_tz }
    }

    pub fn parse(&self, content: &str) -> HoursResult<ParsedFeed> {
        let unfolded = unfold(content);

        if !has_calendar_header(&unfolded) {
            return Err(HoursError::FeedFormat(
                "missing BEGIN:VCALENDAR".to_string(),
            ));
        }

        let calendar =
            read_calendar(&unfolded).map_err(|e| HoursError::FeedFormat(e.to_string()))?;

        let mut vevents = Vec::new();
        for component in &calendar.components {
            collect_vevents(component, &mut vevents);
        }

        let mut feed = ParsedFeed::default();
        for (index, vevent) in vevents.into_iter().enumerate() {
            match self.interval_for(vevent) {
                Ok(interval) => feed.intervals.push(interval),
                Err(reason) => feed.failures.push(EventParseFailure {
                    label: event_label(vevent, index),
                    reason,
                }),
            }
        }

        Ok(feed)
    }

    fn interval_for(&self, vevent: &Component) -> Result<EventInterval, String> {
        let start_time = read_event_time(vevent, "DTSTART")?;
        let start = self.resolve(&start_time, "DTSTART")?;

        let end = match vevent.find_prop("DTEND") {
            Some(_) => {
                let end_time = read_event_time(vevent, "DTEND")?;
                self.resolve(&end_time, "DTEND")?
            }
            None => {
                let prop = vevent
                    .find_prop("DURATION")
                    .ok_or_else(|| "missing DTEND".to_string())?;
                let value = prop.val.as_ref();
                start
                    .checked_add_signed(parse_duration(value)?)
                    .ok_or_else(|| format!("DURATION '{}' out of range", value.trim()))?
            }
        };

        Ok(EventInterval::new(start, end))
    }

    fn resolve(&self, time: &EventTime, name: &str) -> Result<DateTime<Utc>, String> {
        time.to_utc(self.floating_tz)
            .ok_or_else(|| format!("{} {} does not exist in its time zone", name, time))
    }
}

fn has_calendar_header(content: &str) -> bool {
    content
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR"))
}

/// Gather VEVENTs whether or not the parser kept VCALENDAR as a wrapper.
fn collect_vevents<'a, 'b>(component: &'b Component<'a>, out: &mut Vec<&'b Component<'a>>) {
    if component.name == "VEVENT" {
        out.push(component);
        return;
    }
    for child in &component.components {
        collect_vevents(child, out);
    }
}

fn read_event_time(vevent: &Component, name: &str) -> Result<EventTime, String> {
    let prop = vevent
        .find_prop(name)
        .ok_or_else(|| format!("missing {}", name))?;

    DatePerhapsTime::try_from(prop)
        .map(to_event_time)
        .map_err(|_| format!("unparsable {} '{}'", name, prop.val.as_ref()))
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => EventTime::DateTimeZoned {
                datetime: date_time,
                tzid,
            },
        },
    }
}

/// Parse a DURATION value (PT1H30M, P1D, -PT15M).
fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let is_negative = value.starts_with('-');
    let unsigned = value.trim_start_matches(['-', '+']);

    let parsed = iso8601::duration(unsigned)
        .map_err(|_| format!("unparsable DURATION '{}'", value))?;
    let std_duration: std::time::Duration = parsed.into();
    let duration = Duration::from_std(std_duration)
        .map_err(|_| format!("DURATION '{}' out of range", value))?;

    Ok(if is_negative { -duration } else { duration })
}

fn event_label(vevent: &Component, index: usize) -> String {
    let non_empty = |prop: &Property| {
        let val = prop.val.as_ref().trim();
        (!val.is_empty()).then(|| val.to_string())
    };

    vevent
        .find_prop("SUMMARY")
        .and_then(non_empty)
        .or_else(|| vevent.find_prop("UID").and_then(non_empty))
        .unwrap_or_else(|| format!("event #{}", index + 1))
}
