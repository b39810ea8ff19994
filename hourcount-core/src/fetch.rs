//! Fetching raw feed text.
//!
//! The orchestrator only depends on [`FeedFetcher`], so tests can substitute
//! an in-memory fetcher. [`HttpFetcher`] is the network implementation and
//! can route every request through a relay prefix (e.g. a CORS proxy).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{HoursError, HoursResult};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> HoursResult<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    relay_prefix: Option<String>,
}

impl HttpFetcher {
    pub fn new(relay_prefix: Option<String>, timeout: Duration) -> HoursResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HoursError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(HttpFetcher {
            client,
            relay_prefix: relay_prefix.filter(|p| !p.is_empty()),
        })
    }

    /// The URL actually requested for a source URL.
    pub fn request_url(&self, url: &str) -> String {
        let url = match url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => url.to_string(),
        };

        match &self.relay_prefix {
            Some(prefix) => format!("{}{}", prefix, url),
            None => url,
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> HoursResult<String> {
        let request_url = self.request_url(url);
        debug!(%url, %request_url, "fetching feed");

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|e| HoursError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HoursError::fetch(url, format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| HoursError::fetch(url, e))?;
        debug!(%url, bytes = body.len(), "fetched feed");

        Ok(body)
    }
}
