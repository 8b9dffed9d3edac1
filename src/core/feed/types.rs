use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// One item of the outage feed, with its fields kept as the provider sent them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary_html: String,
    /// Raw `pubDate`/`published` text, e.g. `Mon, 15 Jan 2024 10:30:00`.
    pub published_raw: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub title: String,
    pub entries: Vec<FeedEntry>,
}
