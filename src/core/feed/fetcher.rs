use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};

pub const DEFAULT_FEED_BASE_URL: &str = "https://www.elektro-celje.si/si/rss.ashx?k=";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
}

/// The provider keys feeds by lowercased region, appended to the base as-is.
pub fn build_feed_url(base_url: &str, region: &str) -> String {
    format!("{base_url}{}", region.to_lowercase())
}

pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<FetchedFeed, FetchError> {
    let response = client
        .get(url)
        .header(
            ACCEPT,
            "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
        )
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let body = response.bytes().await?.to_vec();

    Ok(FetchedFeed { body, content_type })
}
