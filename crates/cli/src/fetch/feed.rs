//! Announcement feeds: RSS 2.0 `<item>` and Atom `<entry>` documents.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use regex::Regex;

use lagtrack::config::CloudProfile;
use lagtrack::model::{Cloud, FeatureRecord};
use lagtrack::normalize::Normalizer;
use lagtrack::timestamp::parse_or_now;

use super::common::{FetchClient, FetchError};

/// Service label used when a title names no recognizable service.
pub const GENERAL_SERVICE: &str = "General";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Raw date text (`pubDate`, `published`, `updated`, or `dc:date`).
    pub published: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
}

/// Item fields are direct children without a namespace prefix, except
/// Dublin Core's `dc:date`. `media:title` and friends are ignored.
fn field_for(name: QName<'_>) -> Option<Field> {
    let prefix = name.prefix();
    match (prefix.as_ref().map(|p| p.as_ref()), name.local_name().as_ref()) {
        (None, b"title") => Some(Field::Title),
        (None, b"link") => Some(Field::Link),
        (None, b"pubDate" | b"published") | (Some(b"dc"), b"date") => Some(Field::Published),
        (None, b"updated") => Some(Field::Updated),
        _ => None,
    }
}

fn is_item(local_name: &[u8]) -> bool {
    local_name == b"item" || local_name == b"entry"
}

/// Atom links carry the URL in `href`; prefer `rel="alternate"` or no rel.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    match rel.as_deref() {
        None | Some("alternate") => href,
        _ => None,
    }
}

/// Parse every item/entry of an RSS or Atom document.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, String> {
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut updated = String::new();
    let mut field: Option<Field> = None;
    // Element depth below the current item; fields live at depth 1.
    let mut depth = 0usize;
    // Raw (still escaped) text of the field being read.
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if current.is_none() => {
                if is_item(e.local_name().as_ref()) {
                    current = Some(FeedItem::default());
                    updated.clear();
                    depth = 0;
                }
            }
            Ok(Event::Start(ref e)) => {
                depth += 1;
                if depth == 1 {
                    field = field_for(e.name());
                    text.clear();
                    if field == Some(Field::Link) {
                        if let (Some(item), Some(href)) = (current.as_mut(), atom_href(e)) {
                            item.link = href;
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) if current.is_some() && depth == 0 && field_for(e.name()) == Some(Field::Link) => {
                if let (Some(item), Some(href)) = (current.as_mut(), atom_href(e)) {
                    if item.link.is_empty() {
                        item.link = href;
                    }
                }
            }
            Ok(Event::Text(ref e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::GeneralRef(ref e)) if field.is_some() => {
                text.push('&');
                text.push_str(&String::from_utf8_lossy(e));
                text.push(';');
            }
            Ok(Event::CData(ref e)) if field.is_some() => {
                let raw = String::from_utf8_lossy(e);
                text.push_str(&quick_xml::escape::escape(&*raw));
            }
            Ok(Event::End(_)) if current.is_some() && depth == 0 => {
                if let Some(mut item) = current.take() {
                    if item.published.is_empty() {
                        item.published = std::mem::take(&mut updated);
                    }
                    if !item.title.is_empty() {
                        items.push(item);
                    }
                }
                field = None;
            }
            Ok(Event::End(_)) if current.is_some() => {
                if depth == 1 {
                    if let (Some(done), Some(item)) = (field.take(), current.as_mut()) {
                        let value = unescape_lossy(&text);
                        match done {
                            Field::Title => item.title = clean_title(&value),
                            Field::Link if !value.is_empty() => item.link = value,
                            Field::Link => {}
                            Field::Published => item.published = value,
                            Field::Updated => updated = value,
                        }
                    }
                    text.clear();
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn unescape_lossy(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
        .trim()
        .to_string()
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// Strip markup and collapse whitespace.
pub fn clean_title(raw: &str) -> String {
    tag_re()
        .replace_all(raw, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Brand prefixes found in `title`, longest first, each paired with the text
/// that follows it.
fn after_brands<'t>(title: &'t str, brand_prefixes: &[String]) -> Vec<&'t str> {
    let mut prefixes: Vec<&String> = brand_prefixes.iter().collect();
    prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
    prefixes
        .into_iter()
        .filter_map(|prefix| {
            let needle = format!("{} ", prefix.trim());
            title.find(&needle).map(|pos| &title[pos + needle.len()..])
        })
        .collect()
}

/// The original-case span of `alias` in `text`, or the alias itself.
fn original_case<'t>(text: &'t str, alias: &'t str) -> &'t str {
    // ASCII lowering keeps byte offsets aligned with the original.
    match text.to_ascii_lowercase().find(alias) {
        Some(pos) => &text[pos..pos + alias.len()],
        None => alias,
    }
}

/// Guess the service a title is about.
///
/// Order: a known alias right after a brand prefix ("AWS Lambda ..." →
/// "Lambda"), then the longest alias of `cloud` anywhere in the title, then
/// the word after a brand prefix ("Amazon Bedrock ..." → "Bedrock"), then
/// [`GENERAL_SERVICE`].
pub fn extract_service(title: &str, cloud: Cloud, brand_prefixes: &[String], normalizer: &Normalizer) -> String {
    let rests = after_brands(title, brand_prefixes);

    for rest in &rests {
        if let Some(alias) = normalizer.leading_alias(rest, cloud) {
            return original_case(rest, alias).to_string();
        }
    }

    if let Some(alias) = normalizer.find_alias(title, cloud) {
        return original_case(title, alias).to_string();
    }

    for rest in rests {
        let word = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric());
        if !word.is_empty() {
            return word.to_string();
        }
    }

    GENERAL_SERVICE.to_string()
}

/// Turn parsed feed items into unreconciled feature records.
pub fn items_to_features(
    cloud: Cloud,
    profile: &CloudProfile,
    normalizer: &Normalizer,
    items: Vec<FeedItem>,
    now: DateTime<Utc>,
) -> Vec<FeatureRecord> {
    items
        .into_iter()
        .take(profile.max_items)
        .map(|item| {
            let service = extract_service(&item.title, cloud, &profile.brand_prefixes, normalizer);
            let announced = parse_or_now(&item.published, now);
            FeatureRecord::new(cloud, service, item.title, announced, item.link)
        })
        .collect()
}

/// Reads a cloud's announcement feeds, falling over to the next URL when a
/// feed fails or is empty.
pub(crate) struct FeedReader {
    client: FetchClient,
}

impl FeedReader {
    pub(crate) fn new(client: FetchClient) -> Self {
        Self { client }
    }

    pub(crate) fn fetch_features(
        &self,
        cloud: Cloud,
        profile: &CloudProfile,
        normalizer: &Normalizer,
        now: DateTime<Utc>,
    ) -> Result<Vec<FeatureRecord>, FetchError> {
        let mut last_err = FetchError::NoItems {
            source_name: format!("{cloud} feed"),
        };

        for url in profile.feeds.iter().filter(|u| !u.trim().is_empty()) {
            let result = self
                .client
                .request_with_retry_text(|http| http.get(url.as_str()))
                .and_then(|body| {
                    parse_feed(&body).map_err(|message| FetchError::Parse {
                        source_name: self.client.source_name().to_string(),
                        message,
                    })
                });

            match result {
                Ok(items) if !items.is_empty() => {
                    tracing::info!(%cloud, %url, items = items.len(), "feed read");
                    return Ok(items_to_features(cloud, profile, normalizer, items, now));
                }
                Ok(_) => {
                    tracing::warn!(%cloud, %url, "feed had no items, trying next");
                    last_err = FetchError::NoItems {
                        source_name: url.clone(),
                    };
                }
                Err(e) => {
                    tracing::warn!(%cloud, %url, error = %e, "feed failed, trying next");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}
