//! Core of hourcount: totals scheduled hours across remote calendar feeds.
//!
//! - `ics` parses feed text into event intervals
//! - `aggregate` sums the intervals that start inside a `window::DateWindow`
//! - `cache` remembers the hours computed per source URL
//! - `orchestrator` runs all sources concurrently, reusing the cache
//! - `session` exposes the entry points a front end calls on changes

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod fetch;
pub mod ics;
pub mod orchestrator;
pub mod session;
pub mod source;
pub mod window;

pub use error::{HoursError, HoursResult};
