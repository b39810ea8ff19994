//! Summing event durations inside a date window.

use crate::event::EventInterval;
use crate::window::DateWindow;

/// Total hours of the intervals whose start falls inside `window`.
///
/// Only the start instant is tested: an event that begins before the window
/// and ends inside it counts for nothing, while one that begins inside and
/// runs past the end counts in full. Overlapping events are double counted,
/// and an interval ending before it starts contributes a negative amount.
pub fn aggregate(intervals: &[EventInterval], window: &DateWindow) -> f64 {
    intervals
        .iter()
        .map(|interval| {
            if window.contains(interval.start) {
                interval.hours()
            } else {
                0.0
            }
        })
        .sum()
}
