pub mod interactive;
pub mod sources;
pub mod sum;

use std::sync::Arc;

use anyhow::Result;
use hourcount_core::cache::HoursCache;
use hourcount_core::config::HoursConfig;
use hourcount_core::fetch::HttpFetcher;
use hourcount_core::ics::FeedParser;
use hourcount_core::orchestrator::Orchestrator;
use tracing::debug;

/// Orchestrator wired to the network fetcher and a fresh in-memory cache.
pub fn build_orchestrator(config: &HoursConfig) -> Result<Orchestrator> {
    let fetcher = HttpFetcher::new(config.relay_prefix.clone(), config.fetch_timeout())?;
    let parser = FeedParser::new(config.floating_tz()?);
    debug!(
        relay = config.relay_prefix.as_deref().unwrap_or("none"),
        timeout_secs = config.fetch_timeout_secs,
        floating_timezone = %config.floating_timezone,
        "building orchestrator"
    );

    Ok(Orchestrator::new(Arc::new(fetcher), Arc::new(HoursCache::new())).with_parser(parser))
}
