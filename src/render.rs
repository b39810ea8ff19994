//! TUI rendering traits for hourcount types.
//!
//! This module provides extension traits that add colored terminal rendering
//! to hourcount-core types using owo_colors.

use hourcount_core::orchestrator::{AggregationResult, RunStatus, SourceHours};
use hourcount_core::source::CalendarSource;
use hourcount_core::window::DateWindow;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarSource {
    fn render(&self) -> String {
        let name = if self.name.is_empty() {
            "(unnamed)"
        } else {
            self.name.as_str()
        };
        format!("📅 {}", name)
    }
}

impl Render for SourceHours {
    fn render(&self) -> String {
        match self {
            SourceHours::Cached(hours) => {
                format!("{} {}", format_hours(*hours), "(cached)".dimmed())
            }
            SourceHours::Fetched {
                hours,
                skipped_events,
            } => {
                let hours = format_hours(*hours);
                if *skipped_events == 0 {
                    hours
                } else {
                    let note = format!(
                        "({} unreadable {} skipped)",
                        skipped_events,
                        pluralize_event(*skipped_events)
                    );
                    format!("{} {}", hours, note.yellow())
                }
            }
            SourceHours::Failed { reason } => {
                format!("{} {}", "failed".red(), reason.dimmed())
            }
        }
    }
}

impl Render for DateWindow {
    fn render(&self) -> String {
        format!(
            "{} → {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// One line per source in list order, then the total.
pub fn render_result(sources: &[CalendarSource], result: &AggregationResult) -> String {
    let mut lines = Vec::new();

    for source in sources {
        let hours = result
            .hours_for(&source.url)
            .map(Render::render)
            .unwrap_or_else(|| "...".dimmed().to_string());
        lines.push(format!("{}  {}", source.render(), hours));
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }

    let total = format!("Sum: {}", format_hours(result.total));
    let total = match result.status() {
        RunStatus::Succeeded => total.bold().to_string(),
        RunStatus::PartiallyFailed => {
            format!("{} {}", total.bold(), "(some calendars failed)".red())
        }
    };
    lines.push(total);

    if !result.committed {
        lines.push("(superseded by a newer run)".dimmed().to_string());
    }

    lines.join("\n")
}

pub fn format_hours(hours: f64) -> String {
    format!("{:.2}h", hours)
}

fn pluralize_event(count: usize) -> &'static str {
    if count == 1 { "event" } else { "events" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hours_uses_two_decimals() {
        assert_eq!(format_hours(2.0), "2.00h");
        assert_eq!(format_hours(1.0 / 3.0), "0.33h");
        assert_eq!(format_hours(-1.5), "-1.50h");
    }

    #[test]
    fn test_unnamed_source() {
        let source = CalendarSource::new("", "https://a.example");

        assert!(source.render().contains("(unnamed)"));
    }
}
