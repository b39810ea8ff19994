use anyhow::Result;
use hourcount_core::session::edit_sources;
use hourcount_core::source::{CalendarSource, JsonFileStore, SourceStore};
use owo_colors::OwoColorize;

use crate::render::Render;

pub fn list(store: &JsonFileStore) -> Result<()> {
    let sources = store.load();

    if sources.is_empty() {
        println!("{}", "No calendars configured".dimmed());
        return Ok(());
    }

    for source in &sources {
        println!("{}  {}", source.render(), source.url.dimmed());
    }

    Ok(())
}

pub fn add(store: &JsonFileStore, name: String, url: String) -> Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("Calendar URL cannot be empty");
    }

    let source = CalendarSource::new(name, url.trim());
    let sources = edit_sources(store, |sources| sources.push(source.clone()))?;

    if sources.iter().filter(|s| s.url == source.url).count() > 1 {
        println!(
            "{}",
            "  Another calendar already uses this URL; its hours will be counted once.".yellow()
        );
    }
    println!("{}", format!("  Added: {}", source.name).green());

    Ok(())
}

pub fn remove(store: &JsonFileStore, key: &str) -> Result<()> {
    let before = store.load().len();
    let sources = edit_sources(store, |sources| sources.retain(|s| !s.matches(key)))?;

    let removed = before - sources.len();
    if removed == 0 {
        anyhow::bail!("Calendar '{}' not found", key);
    }

    println!("{}", format!("  Removed {} calendar(s)", removed).green());

    Ok(())
}

pub fn rename(store: &JsonFileStore, key: &str, name: String) -> Result<()> {
    if !store.load().iter().any(|s| s.matches(key)) {
        anyhow::bail!("Calendar '{}' not found", key);
    }

    edit_sources(store, |sources| {
        if let Some(source) = sources.iter_mut().find(|s| s.matches(key)) {
            source.name = name.clone();
        }
    })?;

    println!("{}", format!("  Renamed to: {}", name).green());

    Ok(())
}

pub fn set_url(store: &JsonFileStore, key: &str, url: String) -> Result<()> {
    let url = url.trim().to_string();
    if url.is_empty() {
        anyhow::bail!("Calendar URL cannot be empty");
    }
    if !store.load().iter().any(|s| s.matches(key)) {
        anyhow::bail!("Calendar '{}' not found", key);
    }

    edit_sources(store, |sources| {
        if let Some(source) = sources.iter_mut().find(|s| s.matches(key)) {
            source.url = url.clone();
        }
    })?;

    println!("{}", format!("  URL set to: {}", url).green());

    Ok(())
}
