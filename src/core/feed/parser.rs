use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use roxmltree::{Document, Node};

use super::types::{FeedEntry, FeedFormat, ParsedFeed};

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("feed payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("feed declares unsupported encoding {0:?}")]
    UnknownEncoding(String),
    #[error("feed payload is not valid {0}")]
    Malformed(&'static str),
    #[error("xml feed parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("document root <{0}> is neither RSS nor Atom")]
    UnknownRoot(String),
}

static XML_ENCODING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\A<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("valid xml declaration regex")
});

pub fn parse_feed_bytes(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let trimmed = trim_leading_ascii_whitespace(strip_utf8_bom(raw));
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }
    let text = decode_payload(trimmed)?;
    let doc = Document::parse(&text)?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "rss" | "RDF" => Ok(parse_rss(root)),
        "feed" => Ok(parse_atom(root)),
        other => Err(FeedParseError::UnknownRoot(other.to_string())),
    }
}

fn parse_rss(root: Node<'_, '_>) -> ParsedFeed {
    let channel = root
        .children()
        .find(|node| node.has_tag_name("channel"))
        .unwrap_or(root);
    let title = child_text(channel, "title").unwrap_or_else(|| "Untitled Feed".to_string());

    // RSS 1.0 puts items next to the channel, RSS 2.0 inside it.
    let entries = root
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "item")
        .map(|item| FeedEntry {
            title: child_text(item, "title").unwrap_or_default(),
            summary_html: child_text(item, "description")
                .or_else(|| child_text(item, "encoded"))
                .unwrap_or_default(),
            published_raw: child_text(item, "pubDate")
                .or_else(|| child_text(item, "date"))
                .unwrap_or_default(),
        })
        .collect();

    ParsedFeed {
        format: FeedFormat::Rss,
        title,
        entries,
    }
}

fn parse_atom(root: Node<'_, '_>) -> ParsedFeed {
    let title = child_text(root, "title").unwrap_or_else(|| "Untitled Feed".to_string());
    let entries = root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "entry")
        .map(|entry| FeedEntry {
            title: child_text(entry, "title").unwrap_or_default(),
            summary_html: child_text(entry, "summary")
                .or_else(|| child_text(entry, "content"))
                .unwrap_or_default(),
            published_raw: child_text(entry, "published")
                .or_else(|| child_text(entry, "updated"))
                .unwrap_or_default(),
        })
        .collect();

    ParsedFeed {
        format: FeedFormat::Atom,
        title,
        entries,
    }
}

/// Concatenated text of the first child element with the given local name.
/// CDATA sections and escaped markup both come back as plain text.
fn child_text(parent: Node<'_, '_>, local_name: &str) -> Option<String> {
    let child = parent
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == local_name)?;
    let text: String = child
        .descendants()
        .filter(Node::is_text)
        .filter_map(|node| node.text())
        .collect();
    Some(text.trim().to_string())
}

/// Decodes the payload with the charset named in its XML declaration,
/// UTF-8 when there is none.
fn decode_payload(raw: &[u8]) -> Result<Cow<'_, str>, FeedParseError> {
    let encoding = match XML_ENCODING_RE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(label) => {
            let label = label.as_bytes();
            Encoding::for_label(label)
                .ok_or_else(|| {
                    FeedParseError::UnknownEncoding(String::from_utf8_lossy(label).into_owned())
                })?
                // An ASCII declaration means the bytes are not really UTF-16.
                .output_encoding()
        }
        None => UTF_8,
    };
    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(std::str::from_utf8(raw)?));
    }

    let (text, had_errors) = encoding.decode_without_bom_handling(raw);
    if had_errors {
        return Err(FeedParseError::Malformed(encoding.name()));
    }
    Ok(text)
}

fn strip_utf8_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw)
}

fn trim_leading_ascii_whitespace(raw: &[u8]) -> &[u8] {
    let mut index = 0;
    while index < raw.len() && raw[index].is_ascii_whitespace() {
        index += 1;
    }
    &raw[index..]
}
