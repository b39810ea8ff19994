//! Aggregation runs over a list of calendar sources.
//!
//! A run looks at every distinct source URL concurrently. Cached hours are
//! reused unless a full refresh is requested; otherwise the feed is fetched,
//! parsed and summed over the window. A failing source never aborts the run:
//! it is reported as [`SourceHours::Failed`] and contributes zero.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::cache::{Generation, HoursCache};
use crate::error::HoursResult;
use crate::fetch::FeedFetcher;
use crate::ics::FeedParser;
use crate::source::CalendarSource;
use crate::window::DateWindow;

/// Outcome for one source URL in a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceHours {
    /// Reused from the cache without fetching
    Cached(f64),
    /// Freshly fetched and computed
    Fetched { hours: f64, skipped_events: usize },
    /// Fetch or parse failed; counts as zero
    Failed { reason: String },
}

impl SourceHours {
    pub fn hours(&self) -> f64 {
        match self {
            SourceHours::Cached(hours) => *hours,
            SourceHours::Fetched { hours, .. } => *hours,
            SourceHours::Failed { .. } => 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceHours::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    PartiallyFailed,
}

#[derive(Debug, Clone)]
pub struct AggregationResult {
    /// One entry per distinct URL in the run's source list
    pub per_source: BTreeMap<String, SourceHours>,
    pub total: f64,
    pub generation: Generation,
    /// False when a newer run started before this one finished, in which case
    /// the cache was left untouched.
    pub committed: bool,
}

impl AggregationResult {
    pub fn status(&self) -> RunStatus {
        if self.per_source.values().any(SourceHours::is_failed) {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        }
    }

    pub fn hours_for(&self, url: &str) -> Option<&SourceHours> {
        self.per_source.get(url)
    }
}

pub struct Orchestrator {
    fetcher: Arc<dyn FeedFetcher>,
    cache: Arc<HoursCache>,
    parser: FeedParser,
    processing: watch::Sender<bool>,
    in_flight: AtomicUsize,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, cache: Arc<HoursCache>) -> Self {
        let (processing, _) = watch::channel(false);
        Orchestrator {
            fetcher,
            cache,
            parser: FeedParser::default(),
            processing,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_parser(mut self, parser: FeedParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn cache(&self) -> &Arc<HoursCache> {
        &self.cache
    }

    /// True while at least one run is in progress.
    pub fn is_processing(&self) -> bool {
        *self.processing.borrow()
    }

    pub fn subscribe_processing(&self) -> watch::Receiver<bool> {
        self.processing.subscribe()
    }

    pub async fn run(
        &self,
        sources: &[CalendarSource],
        window: &DateWindow,
        force_refresh_all: bool,
    ) -> AggregationResult {
        let _processing = ProcessingGuard::enter(self);
        let generation = self.cache.begin_run();
        let urls = distinct_urls(sources);

        info!(
            generation,
            sources = urls.len(),
            force_refresh_all,
            "starting aggregation run"
        );

        let outcomes = join_all(
            urls.iter()
                .map(|url| self.hours_for(url, window, force_refresh_all)),
        )
        .await;

        let per_source: BTreeMap<String, SourceHours> = urls.into_iter().zip(outcomes).collect();

        let computed: HashMap<String, f64> = per_source
            .iter()
            .filter(|(_, outcome)| !outcome.is_failed())
            .map(|(url, outcome)| (url.clone(), outcome.hours()))
            .collect();
        let committed = self.cache.commit(generation, &computed);

        let total = per_source.values().map(SourceHours::hours).sum();

        let result = AggregationResult {
            per_source,
            total,
            generation,
            committed,
        };

        info!(
            generation,
            total,
            committed,
            status = ?result.status(),
            "finished aggregation run"
        );

        result
    }

    async fn hours_for(&self, url: &str, window: &DateWindow, force_refresh_all: bool) -> SourceHours {
        if url.trim().is_empty() {
            warn!("skipping source without a URL");
            return SourceHours::Failed {
                reason: "source has no URL".to_string(),
            };
        }

        if !force_refresh_all {
            if let Some(hours) = self.cache.get(url) {
                debug!(%url, hours, "reusing cached hours");
                return SourceHours::Cached(hours);
            }
        }

        match self.compute(url, window).await {
            Ok((hours, skipped_events)) => SourceHours::Fetched {
                hours,
                skipped_events,
            },
            Err(e) => {
                warn!(%url, error = %e, "source failed, counting it as zero");
                SourceHours::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn compute(&self, url: &str, window: &DateWindow) -> HoursResult<(f64, usize)> {
        let text = self.fetcher.fetch_text(url).await?;
        let feed = self.parser.parse(&text)?;

        for failure in &feed.failures {
            warn!(%url, event = %failure.label, reason = %failure.reason, "skipping event");
        }

        let hours = aggregate(&feed.intervals, window);
        debug!(%url, hours, events = feed.intervals.len(), "computed hours");

        Ok((hours, feed.failures.len()))
    }
}

/// Keeps the processing flag raised for the lifetime of a run, including a
/// run whose future is dropped early.
struct ProcessingGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(orchestrator: &'a Orchestrator) -> Self {
        orchestrator.in_flight.fetch_add(1, Ordering::SeqCst);
        orchestrator.processing.send_replace(true);
        ProcessingGuard { orchestrator }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.orchestrator.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.orchestrator.processing.send_replace(false);
        }
    }
}

/// URLs in first-seen order, each once.
fn distinct_urls(sources: &[CalendarSource]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(sources.len());

    for source in sources {
        if seen.insert(source.url.as_str()) {
            urls.push(source.url.clone());
        } else {
            warn!(url = %source.url, name = %source.name, "duplicate source URL, computing it once");
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HoursError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    /// Feed with one event of `hours` length on 2024-01-10.
    fn feed(hours: u32) -> String {
        format!(
            "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n\
BEGIN:VEVENT\nUID:e1\nDTSTART:20240110T080000Z\nDTEND:20240110T{:02}0000Z\nEND:VEVENT\n\
END:VCALENDAR",
            8 + hours
        )
    }

    fn january() -> DateWindow {
        DateWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
        )
    }

    #[derive(Default)]
    struct FakeFetcher {
        feeds: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, body: impl Into<String>) -> Self {
            self.feeds.insert(url.to_string(), Ok(body.into()));
            self
        }

        fn failing(mut self, url: &str, reason: &str) -> Self {
            self.feeds.insert(url.to_string(), Err(reason.to_string()));
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl FeedFetcher for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> HoursResult<String> {
            self.calls.lock().push(url.to_string());
            match self.feeds.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(HoursError::fetch(url, reason)),
                None => Err(HoursError::fetch(url, "not found")),
            }
        }
    }

    fn orchestrator(fetcher: &Arc<FakeFetcher>) -> Orchestrator {
        Orchestrator::new(fetcher.clone(), Arc::new(HoursCache::new()))
    }

    #[tokio::test]
    async fn test_single_event_scenario() {
        let ics = "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n\
BEGIN:VEVENT\nUID:e1\nDTSTART:20240101T090000\nDTEND:20240101T110000\nEND:VEVENT\n\
END:VCALENDAR";
        let fetcher = Arc::new(FakeFetcher::default().with("https://a.example", ics));
        let orch = orchestrator(&fetcher);
        let window = DateWindow::from_args(Some("2024-01-01"), Some("2024-01-31")).unwrap();

        let result = orch
            .run(&[CalendarSource::new("A", "https://a.example")], &window, false)
            .await;

        assert_eq!(result.total, 2.0);
        assert_eq!(result.status(), RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_source_list() {
        let fetcher = Arc::new(FakeFetcher::default());
        let orch = orchestrator(&fetcher);

        let result = orch.run(&[], &january(), true).await;

        assert_eq!(result.total, 0.0);
        assert!(result.per_source.is_empty());
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cached_and_fresh_sources_are_summed() {
        let fetcher = Arc::new(FakeFetcher::default().with("https://b.example", feed(1)));
        let orch = orchestrator(&fetcher);
        orch.cache().put("https://a.example", 3.5);
        let sources = vec![
            CalendarSource::new("A", "https://a.example"),
            CalendarSource::new("B", "https://b.example"),
        ];

        let result = orch.run(&sources, &january(), false).await;

        assert_eq!(result.total, 4.5);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(
            result.hours_for("https://a.example"),
            Some(&SourceHours::Cached(3.5))
        );
        assert_eq!(orch.cache().get("https://b.example"), Some(1.0));
    }

    #[tokio::test]
    async fn test_second_run_reuses_cache() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://a.example", feed(2))
                .with("https://b.example", feed(3)),
        );
        let orch = orchestrator(&fetcher);
        let sources = vec![
            CalendarSource::new("A", "https://a.example"),
            CalendarSource::new("B", "https://b.example"),
        ];

        let first = orch.run(&sources, &january(), false).await;
        let fetches_after_first = fetcher.call_count();
        let second = orch.run(&sources, &january(), false).await;

        assert_eq!(fetches_after_first, 2);
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(first.total, 5.0);
        assert_eq!(second.total, first.total);
    }

    #[tokio::test]
    async fn test_full_refresh_fetches_every_source() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://a.example", feed(2))
                .with("https://b.example", feed(3)),
        );
        let orch = orchestrator(&fetcher);
        orch.cache().put("https://a.example", 10.0);
        orch.cache().put("https://b.example", 10.0);
        orch.cache().put("https://removed.example", 99.0);
        let sources = vec![
            CalendarSource::new("A", "https://a.example"),
            CalendarSource::new("B", "https://b.example"),
        ];

        let result = orch.run(&sources, &january(), true).await;

        assert_eq!(fetcher.call_count(), 2);
        let urls: Vec<&str> = result.per_source.keys().map(String::as_str).collect();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
        assert_eq!(result.total, 5.0);
        assert_eq!(orch.cache().get("https://a.example"), Some(2.0));
        // Orphaned entries stay in the cache but are not counted
        assert_eq!(orch.cache().get("https://removed.example"), Some(99.0));
    }

    #[tokio::test]
    async fn test_failed_source_counts_zero_and_is_not_cached() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("https://a.example", feed(2))
                .failing("https://down.example", "connection refused")
                .with("https://html.example", "<html>blocked</html>"),
        );
        let orch = orchestrator(&fetcher);
        let sources = vec![
            CalendarSource::new("A", "https://a.example"),
            CalendarSource::new("Down", "https://down.example"),
            CalendarSource::new("Html", "https://html.example"),
        ];

        let result = orch.run(&sources, &january(), false).await;

        assert_eq!(result.total, 2.0);
        assert_eq!(result.status(), RunStatus::PartiallyFailed);
        assert!(result.hours_for("https://down.example").unwrap().is_failed());
        assert!(result.hours_for("https://html.example").unwrap().is_failed());
        assert_eq!(orch.cache().get("https://down.example"), None);

        // Failed sources are retried on the next run
        orch.run(&sources, &january(), false).await;
        assert_eq!(fetcher.call_count(), 5);
    }

    #[tokio::test]
    async fn test_malformed_events_are_skipped() {
        let ics = "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\n\
BEGIN:VEVENT\nUID:bad\nDTSTART:garbage\nDTEND:20240110T100000Z\nEND:VEVENT\n\
BEGIN:VEVENT\nUID:good\nDTSTART:20240110T080000Z\nDTEND:20240110T090000Z\nEND:VEVENT\n\
END:VCALENDAR";
        let fetcher = Arc::new(FakeFetcher::default().with("https://a.example", ics));
        let orch = orchestrator(&fetcher);

        let result = orch
            .run(&[CalendarSource::new("A", "https://a.example")], &january(), false)
            .await;

        assert_eq!(
            result.hours_for("https://a.example"),
            Some(&SourceHours::Fetched {
                hours: 1.0,
                skipped_events: 1
            })
        );
        assert_eq!(result.status(), RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_duplicate_urls_are_fetched_once() {
        let fetcher = Arc::new(FakeFetcher::default().with("https://a.example", feed(2)));
        let orch = orchestrator(&fetcher);
        let sources = vec![
            CalendarSource::new("A", "https://a.example"),
            CalendarSource::new("A again", "https://a.example"),
        ];

        let result = orch.run(&sources, &january(), true).await;

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(result.per_source.len(), 1);
        assert_eq!(result.total, 2.0);
    }

    #[tokio::test]
    async fn test_blank_url_fails_without_fetch() {
        let fetcher = Arc::new(FakeFetcher::default());
        let orch = orchestrator(&fetcher);

        let result = orch
            .run(&[CalendarSource::new("New calendar", "")], &january(), true)
            .await;

        assert_eq!(fetcher.call_count(), 0);
        assert!(result.hours_for("").unwrap().is_failed());
        assert_eq!(result.total, 0.0);
    }

    #[tokio::test]
    async fn test_zero_hours_are_cached() {
        let empty = "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:TEST\nEND:VCALENDAR";
        let fetcher = Arc::new(FakeFetcher::default().with("https://a.example", empty));
        let orch = orchestrator(&fetcher);
        let sources = vec![CalendarSource::new("A", "https://a.example")];

        orch.run(&sources, &january(), false).await;
        let second = orch.run(&sources, &january(), false).await;

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(
            second.hours_for("https://a.example"),
            Some(&SourceHours::Cached(0.0))
        );
    }

    /// First fetch blocks until released; later fetches answer at once.
    struct GatedFetcher {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedFetcher for GatedFetcher {
        async fn fetch_text(&self, _url: &str) -> HoursResult<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
                Ok(feed(1))
            } else {
                Ok(feed(2))
            }
        }
    }

    #[tokio::test]
    async fn test_superseded_run_does_not_overwrite_cache() {
        let fetcher = Arc::new(GatedFetcher {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let orch = Orchestrator::new(fetcher.clone(), Arc::new(HoursCache::new()));
        let sources = vec![CalendarSource::new("A", "https://a.example")];
        let window = january();

        let (old, new) = tokio::join!(orch.run(&sources, &window, true), async {
            tokio::task::yield_now().await;
            assert!(orch.is_processing());
            let new = orch.run(&sources, &window, true).await;
            fetcher.gate.notify_one();
            new
        });

        assert!(new.committed);
        assert!(!old.committed);
        assert!(old.generation < new.generation);
        assert_eq!(old.total, 1.0);
        assert_eq!(orch.cache().get("https://a.example"), Some(2.0));
        assert!(!orch.is_processing());
    }

    #[tokio::test]
    async fn test_processing_flag_resets_after_run() {
        let fetcher = Arc::new(FakeFetcher::default().with("https://a.example", feed(1)));
        let orch = orchestrator(&fetcher);
        let mut processing = orch.subscribe_processing();
        assert!(!*processing.borrow());

        orch.run(&[CalendarSource::new("A", "https://a.example")], &january(), true)
            .await;

        assert!(processing.has_changed().unwrap());
        assert!(!*processing.borrow_and_update());
    }
}
