//! Interactive session: a menu loop that recomputes after every change.
//!
//! Window and source edits reuse hours already computed in this session;
//! only "Refresh all" fetches every calendar again.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dialoguer::{Input, Select};
use hourcount_core::config::HoursConfig;
use hourcount_core::orchestrator::AggregationResult;
use hourcount_core::session::Session;
use hourcount_core::source::{CalendarSource, JsonFileStore};
use hourcount_core::window::{Bound, DateWindow, parse_bound};
use owo_colors::OwoColorize;

use super::build_orchestrator;
use crate::render::{Render, render_result};
use crate::utils::tui;

const ACTIONS: [&str; 8] = [
    "Refresh all",
    "Change start date",
    "Change end date",
    "Add calendar",
    "Remove calendar",
    "Rename calendar",
    "Change calendar URL",
    "Quit",
];

pub async fn run(config: &HoursConfig, store: JsonFileStore, window: DateWindow) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let (mut session, result) =
        with_spinner(Session::start(Arc::new(store), orchestrator, window)).await;
    show(&session, &result);

    loop {
        let choice = Select::new()
            .with_prompt("  What next?")
            .items(&ACTIONS)
            .default(0)
            .interact()?;

        let result = match ACTIONS[choice] {
            "Refresh all" => with_spinner(session.on_manual_refresh()).await,
            "Change start date" => {
                let start = prompt_bound("  Start date (YYYY-MM-DD)", Bound::Start)?;
                let window = session.window().with_start(start);
                with_spinner(session.on_window_changed(window)).await
            }
            "Change end date" => {
                let end = prompt_bound("  End date (YYYY-MM-DD)", Bound::End)?;
                let window = session.window().with_end(end);
                with_spinner(session.on_window_changed(window)).await
            }
            "Add calendar" => {
                let source = prompt_source()?;
                with_spinner(session.add_source(source)).await
            }
            "Remove calendar" => {
                let Some(index) = pick_source(&session, "  Remove which calendar?")? else {
                    continue;
                };
                match with_spinner(session.remove_source(index)).await {
                    Some(result) => result,
                    None => continue,
                }
            }
            "Rename calendar" => {
                let Some(index) = pick_source(&session, "  Rename which calendar?")? else {
                    continue;
                };
                let name: String = Input::new().with_prompt("  New name").interact_text()?;
                match with_spinner(session.rename_source(index, &name)).await {
                    Some(result) => result,
                    None => continue,
                }
            }
            "Change calendar URL" => {
                let Some(index) = pick_source(&session, "  Change which calendar?")? else {
                    continue;
                };
                let url = prompt_url(Some(&session.sources()[index].url))?;
                match with_spinner(session.set_source_url(index, &url)).await {
                    Some(result) => result,
                    None => continue,
                }
            }
            _ => return Ok(()),
        };

        println!();
        show(&session, &result);
    }
}

async fn with_spinner<F: Future>(future: F) -> F::Output {
    let spinner = tui::create_spinner("Counting hours".to_string());
    let output = future.await;
    spinner.finish_and_clear();
    output
}

fn show(session: &Session, result: &AggregationResult) {
    println!("{}", session.window().render().dimmed());
    if session.sources().is_empty() {
        println!("{}", "No calendars yet".dimmed());
    }
    println!("{}", render_result(session.sources(), result));
    println!();
}

/// Prompt the user with retry on parse errors.
fn prompt_bound(prompt: &str, bound: Bound) -> Result<DateTime<Utc>> {
    loop {
        let input: String = Input::new().with_prompt(prompt).interact_text()?;
        match parse_bound(&input, bound) {
            Ok(result) => return Ok(result),
            Err(e) => {
                eprintln!("  {}", e.red());
            }
        }
    }
}

fn prompt_source() -> Result<CalendarSource> {
    let name: String = Input::new()
        .with_prompt("  Name")
        .default("New calendar".to_string())
        .interact_text()?;

    let url = prompt_url(None)?;

    Ok(CalendarSource::new(name, url))
}

fn prompt_url(current: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt("  URL");
    if let Some(current) = current {
        input = input.with_initial_text(current);
    }

    let url = input
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("URL cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(url.trim().to_string())
}

/// Returns the position of the chosen source, or `None` when there are none.
fn pick_source(session: &Session, prompt: &str) -> Result<Option<usize>> {
    if session.sources().is_empty() {
        println!("{}", "  No calendars to choose from".dimmed());
        return Ok(None);
    }

    let labels: Vec<String> = session
        .sources()
        .iter()
        .map(|s| format!("{} {}", s.render(), s.url.dimmed()))
        .collect();

    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(Some(choice))
}
