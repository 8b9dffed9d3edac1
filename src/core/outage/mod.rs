pub mod html;
pub mod published;
pub mod types;
pub mod window;

use tracing::{debug, info, info_span, Span};

use crate::core::feed::types::FeedEntry;
use html::{decode_summary, extract_date_list_text};
use published::parse_published;
use types::OutageRecord;
use window::parse_window;

pub const DEFAULT_LABEL_PREFIX: &str = "Izpad elektrike";

/// First entry, in feed order, whose summary contains `token` ignoring case.
/// Plain substring match: `"Lava"` also matches `"Lavaška"`.
pub fn find_match<'a>(entries: &'a [FeedEntry], token: &str) -> Option<&'a FeedEntry> {
    let needle = token.to_lowercase();
    entries
        .iter()
        .find(|entry| entry.summary_html.to_lowercase().contains(&needle))
}

/// Turns feed entries into an [`OutageRecord`] for one station.
#[derive(Debug, Clone)]
pub struct OutageExtractor {
    station: String,
    label_prefix: String,
    span: Span,
}

impl OutageExtractor {
    pub fn new(station: &str) -> Self {
        Self::with_label_prefix(station, DEFAULT_LABEL_PREFIX)
    }

    pub fn with_label_prefix(station: &str, label_prefix: &str) -> Self {
        Self {
            station: station.to_string(),
            label_prefix: label_prefix.to_string(),
            span: info_span!("outage_extractor", station = %station),
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn extract(&self, entries: &[FeedEntry]) -> OutageRecord {
        self.span.in_scope(|| match find_match(entries, &self.station) {
            Some(entry) => {
                info!("station found in outage feed");
                debug!(title = %entry.title, "matched feed entry");
                self.record_for(entry)
            }
            None => {
                info!(entries = entries.len(), "station not found in outage feed");
                OutageRecord::not_found()
            }
        })
    }

    fn record_for(&self, entry: &FeedEntry) -> OutageRecord {
        let published_at = parse_published(&entry.published_raw);
        let summary_text = decode_summary(&entry.summary_html);

        let fragment = extract_date_list_text(&summary_text);
        if fragment.is_none() {
            debug!("matched entry has no dates-list item");
        }
        let window = fragment.as_deref().and_then(parse_window);
        let window_label = fragment.map(|text| format!("{} {text}", self.label_prefix));

        OutageRecord {
            found: true,
            published_at,
            summary_text,
            window_label,
            start_at: window.map(|window| window.start),
            end_at: window.map(|window| window.end),
        }
    }
}
