use std::sync::Arc;

use anyhow::Result;
use hourcount_core::config::HoursConfig;
use hourcount_core::session::Session;
use hourcount_core::source::JsonFileStore;
use hourcount_core::window::DateWindow;
use owo_colors::OwoColorize;

use super::build_orchestrator;
use crate::render::{Render, render_result};
use crate::utils::tui;

pub async fn run(config: &HoursConfig, store: JsonFileStore, window: DateWindow) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let spinner = tui::create_spinner(format!("Counting hours {}", window.render()));
    let (session, result) = Session::start(Arc::new(store), orchestrator, window).await;
    spinner.finish_and_clear();

    if session.sources().is_empty() {
        println!(
            "{}",
            "No calendars configured. Add one with:\n  hourcount add <name> <url>".dimmed()
        );
        return Ok(());
    }

    println!("{}", window.render().dimmed());
    println!("{}", render_result(session.sources(), &result));

    Ok(())
}
