use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Result of one poll cycle. Built fresh each cycle and never mutated.
///
/// When `found` is false every other field is empty. `window_label` and the
/// start/end timestamps fail independently: a label can be present while
/// the times are not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutageRecord {
    pub found: bool,
    pub published_at: Option<NaiveDateTime>,
    pub summary_text: String,
    pub window_label: Option<String>,
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
}

impl OutageRecord {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Start and end of an outage on a single calendar day; `start <= end`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutageWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}
