use chrono::{NaiveDateTime, Weekday};
use tracing::{debug, warn};

/// Date and time after the `Mon, ` weekday prefix: `15 Jan 2024 10:30:00`.
/// English month abbreviations, no timezone.
pub const PUBLISHED_FORMAT: &str = "%d %b %Y %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum PublishedParseError {
    #[error("no weekday prefix in {0:?}")]
    MissingWeekday(String),
    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),
    #[error(transparent)]
    Timestamp(#[from] chrono::ParseError),
}

/// Parses the provider's publication timestamp as naive local time.
///
/// The weekday must be an English day name but is not checked against the
/// date, so a feed that stamps `Tue, 15 Jan 2024` still yields 15 January.
/// Surrounding whitespace is rejected.
pub fn try_parse_published(raw: &str) -> Result<NaiveDateTime, PublishedParseError> {
    let (weekday, timestamp) = raw
        .split_once(", ")
        .ok_or_else(|| PublishedParseError::MissingWeekday(raw.to_string()))?;
    weekday
        .parse::<Weekday>()
        .map_err(|_| PublishedParseError::UnknownWeekday(weekday.to_string()))?;
    Ok(NaiveDateTime::parse_from_str(timestamp, PUBLISHED_FORMAT)?)
}

pub fn parse_published(raw: &str) -> Option<NaiveDateTime> {
    debug!(raw, "parsing published date");
    try_parse_published(raw)
        .inspect_err(|err| warn!(raw, error = %err, "published date parse error"))
        .ok()
}
