//! A user session: the current source list and window, plus the entry
//! points a front end calls when either changes.
//!
//! Changing the sources or the window reuses cached hours. Starting the
//! session and asking for a manual refresh recompute every source.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::HoursResult;
use crate::orchestrator::{AggregationResult, Orchestrator};
use crate::source::{CalendarSource, SourceStore};
use crate::window::DateWindow;

pub struct Session {
    store: Arc<dyn SourceStore>,
    orchestrator: Orchestrator,
    sources: Vec<CalendarSource>,
    window: DateWindow,
}

impl Session {
    /// Load the persisted source list and compute every source once
    /// against `window`.
    pub async fn start(
        store: Arc<dyn SourceStore>,
        orchestrator: Orchestrator,
        window: DateWindow,
    ) -> (Self, AggregationResult) {
        let sources = store.load();
        info!(sources = sources.len(), "loaded source list");

        let session = Session {
            store,
            orchestrator,
            sources,
            window,
        };
        let result = session.run(true).await;

        (session, result)
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Replace the source list, persist it, and recompute with the cache.
    /// A failed save is logged; the new list is still used.
    pub async fn on_sources_changed(&mut self, sources: Vec<CalendarSource>) -> AggregationResult {
        self.sources = sources;

        if let Err(e) = self.store.save(&self.sources) {
            warn!(error = %e, "could not save source list");
        }

        self.run(false).await
    }

    pub async fn on_window_changed(&mut self, window: DateWindow) -> AggregationResult {
        self.window = window;
        self.run(false).await
    }

    pub async fn on_manual_refresh(&self) -> AggregationResult {
        self.run(true).await
    }

    pub async fn add_source(&mut self, source: CalendarSource) -> AggregationResult {
        let mut sources = self.sources.clone();
        sources.push(source);
        self.on_sources_changed(sources).await
    }

    /// Remove the source at `index`. Returns `None` when there is no such row.
    pub async fn remove_source(&mut self, index: usize) -> Option<AggregationResult> {
        if index >= self.sources.len() {
            return None;
        }

        let mut sources = self.sources.clone();
        sources.remove(index);

        Some(self.on_sources_changed(sources).await)
    }

    pub async fn rename_source(
        &mut self,
        index: usize,
        new_name: &str,
    ) -> Option<AggregationResult> {
        self.update_source(index, |source| source.name = new_name.to_string())
            .await
    }

    /// Point the row at `index` to a new feed. The row keeps its position and
    /// name; the new URL is fetched unless it is already cached.
    pub async fn set_source_url(&mut self, index: usize, url: &str) -> Option<AggregationResult> {
        self.update_source(index, |source| source.url = url.trim().to_string())
            .await
    }

    async fn update_source<F>(&mut self, index: usize, edit: F) -> Option<AggregationResult>
    where
        F: FnOnce(&mut CalendarSource),
    {
        let mut sources = self.sources.clone();
        edit(sources.get_mut(index)?);

        Some(self.on_sources_changed(sources).await)
    }

    async fn run(&self, force_refresh_all: bool) -> AggregationResult {
        self.orchestrator
            .run(&self.sources, &self.window, force_refresh_all)
            .await
    }
}

/// Edit the persisted list without computing anything.
pub fn edit_sources<F>(store: &dyn SourceStore, edit: F) -> HoursResult<Vec<CalendarSource>>
where
    F: FnOnce(&mut Vec<CalendarSource>),
{
    let mut sources = store.load();
    edit(&mut sources);
    store.save(&sources)?;
    Ok(sources)
}
