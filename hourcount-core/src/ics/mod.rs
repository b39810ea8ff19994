//! iCalendar feed parsing.
//!
//! This module reads VEVENT start/end values according to RFC 5545 and turns
//! them into absolute intervals.

mod parse;

pub use parse::{EventParseFailure, FeedParser, ParsedFeed};
