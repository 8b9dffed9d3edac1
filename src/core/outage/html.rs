use std::sync::LazyLock;

use scraper::{Html, Selector};

static DATES_LIST_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.dates-list").expect("valid dates-list selector"));
static LIST_ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid li selector"));

/// Decodes HTML entities in a feed summary (`&amp;` → `&`, `&scaron;` → `š`).
pub fn decode_summary(summary_html: &str) -> String {
    html_escape::decode_html_entities(summary_html).into_owned()
}

/// Text of the first `<li>` inside the first `<ul class="dates-list">`.
///
/// Malformed markup is tolerated. Returns `None` when the list, its first
/// item, or any text inside that item is missing.
pub fn extract_date_list_text(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let list = fragment.select(&DATES_LIST_SELECTOR).next()?;
    let item = list.select(&LIST_ITEM_SELECTOR).next()?;
    let text: String = item.text().collect();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}
