use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use tracing::{debug, warn};

use super::types::OutageWindow;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\. *\w+ \d{4}").expect("valid date regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}:\d{2}").expect("valid time regex"));

/// Slovenian genitive month names, in calendar order. Lookup order matters:
/// the first name found anywhere in the date text wins.
const SLOVENIAN_MONTHS: [(&str, &str); 12] = [
    ("januarja", "january"),
    ("februarja", "february"),
    ("marca", "march"),
    ("aprila", "april"),
    ("maja", "may"),
    ("junija", "june"),
    ("julija", "july"),
    ("avgusta", "august"),
    ("septembra", "september"),
    ("oktobra", "october"),
    ("novembra", "november"),
    ("decembra", "december"),
];

const DATE_FORMAT: &str = "%d. %B %Y";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowParseError {
    #[error("no date of the form `15. marca 2024` in {0:?}")]
    MissingDate(String),
    #[error("date {0:?} has no space between the day and the month")]
    UnspacedDate(String),
    #[error("expected at least two HH:MM times, found {found}")]
    MissingTimes { found: usize },
    #[error("date {date:?} does not parse: {source}")]
    InvalidDate {
        date: String,
        source: chrono::ParseError,
    },
    #[error("time {time:?} does not parse: {source}")]
    InvalidTime {
        time: String,
        source: chrono::ParseError,
    },
    #[error("outage ends at {end} before it starts at {start}")]
    EndBeforeStart { start: NaiveTime, end: NaiveTime },
}

/// Replaces the first Slovenian month name found in `date` with its English
/// equivalent. Text without a known month name is returned unchanged.
pub fn normalize_month(date: &str) -> String {
    SLOVENIAN_MONTHS
        .iter()
        .find(|(slovenian, _)| date.contains(slovenian))
        .map_or_else(
            || date.to_string(),
            |(slovenian, english)| date.replace(slovenian, english),
        )
}

/// Reads the outage window out of a dates-list fragment such as
/// `izpad od 15. marca 2024 od 08:00 do 14:30`.
///
/// The first date and the first two times are used; any further times in
/// the text are ignored. Fails without a partial result.
pub fn try_parse_window(fragment: &str) -> Result<OutageWindow, WindowParseError> {
    let date_text = DATE_RE
        .find(fragment)
        .ok_or_else(|| WindowParseError::MissingDate(fragment.to_string()))?
        .as_str();
    // `15.marca 2024` is matched above but is not a valid date.
    let Some((day, month_year)) = date_text
        .split_once('.')
        .filter(|(_, rest)| rest.starts_with(char::is_whitespace))
    else {
        return Err(WindowParseError::UnspacedDate(date_text.to_string()));
    };

    let times: Vec<&str> = TIME_RE
        .find_iter(fragment)
        .map(|found| found.as_str())
        .collect();
    let [start_text, end_text, ..] = times.as_slice() else {
        return Err(WindowParseError::MissingTimes { found: times.len() });
    };

    let normalized = normalize_month(&format!("{day}. {}", month_year.trim_start()));
    let date = NaiveDate::parse_from_str(&normalized, DATE_FORMAT).map_err(|source| {
        WindowParseError::InvalidDate {
            date: normalized.clone(),
            source,
        }
    })?;
    let start = parse_time(start_text)?;
    let end = parse_time(end_text)?;
    if end < start {
        return Err(WindowParseError::EndBeforeStart { start, end });
    }

    Ok(OutageWindow {
        start: date.and_time(start),
        end: date.and_time(end),
    })
}

/// [`try_parse_window`] with failures logged and reported as "no window".
pub fn parse_window(fragment: &str) -> Option<OutageWindow> {
    debug!(fragment, "parsing outage window");
    try_parse_window(fragment)
        .inspect_err(|err| warn!(error = %err, "outage window parse error"))
        .ok()
}

fn parse_time(text: &str) -> Result<NaiveTime, WindowParseError> {
    NaiveTime::parse_from_str(text, TIME_FORMAT).map_err(|source| WindowParseError::InvalidTime {
        time: text.to_string(),
        source,
    })
}
