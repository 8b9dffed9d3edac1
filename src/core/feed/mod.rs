pub mod fetcher;
pub mod parser;
pub mod types;

use std::time::Duration;

use tracing::{debug, error, info_span, Instrument, Span};

use fetcher::{build_feed_url, fetch_feed, FetchError, DEFAULT_REQUEST_TIMEOUT};
use parser::{parse_feed_bytes, FeedParseError};
use types::FeedEntry;

const USER_AGENT: &str = concat!("elektro-celje-outage/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] FeedParseError),
}

/// Retrieves the outage feed of one region. Every call is a single,
/// independent request; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    base_url: String,
    region: String,
    span: Span,
}

impl FeedFetcher {
    pub fn new(region: &str, base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FeedError::Client)?;
        Ok(Self::with_client(client, region, base_url))
    }

    pub fn with_client(client: reqwest::Client, region: &str, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            region: region.to_string(),
            span: info_span!("feed_fetcher", region = %region),
        }
    }

    /// Fetcher with [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn for_region(region: &str, base_url: &str) -> Result<Self, FeedError> {
        Self::new(region, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn feed_url(&self) -> String {
        build_feed_url(&self.base_url, &self.region)
    }

    pub async fn try_fetch(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let url = self.feed_url();
        async {
            debug!(%url, "fetching outage feed");
            let fetched = fetch_feed(&self.client, &url).await?;
            let parsed = parse_feed_bytes(&fetched.body)?;
            debug!(
                entries = parsed.entries.len(),
                content_type = fetched.content_type.as_deref().unwrap_or("unknown"),
                "outage feed parsed"
            );
            Ok::<_, FeedError>(parsed.entries)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Failures are logged and reported as an empty feed, which callers
    /// treat the same as "no outage announced".
    pub async fn fetch(&self) -> Vec<FeedEntry> {
        match self.try_fetch().await {
            Ok(entries) => entries,
            Err(err) => {
                self.span.in_scope(|| {
                    error!(error = %err, "error fetching or parsing outage feed");
                });
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fetcher::tests::spawn_feed_server;
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn fetch_returns_feed_entries_in_order() {
        let (base, _state, server_task) = spawn_feed_server(
            StatusCode::OK,
            include_str!("../../../fixtures/elektro-celje.rss.xml"),
        )
        .await;
        let fetcher = FeedFetcher::with_client(reqwest::Client::new(), "CELJE", &base);

        let entries = fetcher.fetch().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Izklop TP Celje Lava");
        assert_eq!(entries[2].title, "Obvestilo TP Gaberje");

        server_task.abort();
    }

    #[tokio::test]
    async fn fetch_degrades_to_empty_on_http_failure() {
        let (base, _state, server_task) =
            spawn_feed_server(StatusCode::SERVICE_UNAVAILABLE, "maintenance").await;
        let fetcher = FeedFetcher::with_client(reqwest::Client::new(), "celje", &base);

        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::Fetch(FetchError::HttpStatus(503)))
        ));
        assert!(fetcher.fetch().await.is_empty());

        server_task.abort();
    }

    #[tokio::test]
    async fn fetch_degrades_to_empty_on_malformed_feed() {
        let (base, _state, server_task) =
            spawn_feed_server(StatusCode::OK, "<html><body>not a feed</body></html>").await;
        let fetcher = FeedFetcher::with_client(reqwest::Client::new(), "celje", &base);

        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::Parse(FeedParseError::UnknownRoot(_)))
        ));
        assert!(fetcher.fetch().await.is_empty());

        server_task.abort();
    }

    #[tokio::test]
    async fn stalled_upstream_times_out_to_empty() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let server_task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let base = format!("http://{address}/si/rss.ashx?k=");

        let fetcher = FeedFetcher::new("celje", &base, Duration::from_millis(200))
            .expect("client should build");
        let started = std::time::Instant::now();
        assert!(matches!(
            fetcher.try_fetch().await,
            Err(FeedError::Fetch(FetchError::Request(err))) if err.is_timeout()
        ));
        assert!(fetcher.fetch().await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));

        server_task.abort();
    }

    #[test]
    fn default_fetcher_uses_provider_endpoint() {
        let fetcher = FeedFetcher::for_region("CELJE", fetcher::DEFAULT_FEED_BASE_URL)
            .expect("client should build");
        assert_eq!(
            fetcher.feed_url(),
            "https://www.elektro-celje.si/si/rss.ashx?k=celje"
        );
    }

    #[tokio::test]
    async fn fetch_degrades_to_empty_when_unreachable() {
        let fetcher = FeedFetcher::with_client(
            reqwest::Client::new(),
            "celje",
            "http://127.0.0.1:9/si/rss.ashx?k=",
        );

        assert!(fetcher.fetch().await.is_empty());
    }
}
