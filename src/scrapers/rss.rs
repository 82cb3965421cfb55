//! RSS 2.0 / Atom feed reader.
//!
//! Used for the OpenAI blog by default, but any feed URL works. Both element
//! shapes are understood:
//!
//! ```text
//! RSS 2.0: rss > channel > item { title, link, pubDate, description }
//! Atom:    feed > entry { title, link[href], published, summary }
//! ```
//!
//! The root element (`rss`, RDF or `feed`) decides which shape is read.
//! Entries older than the recency window are dropped, entries with
//! a missing or unparseable date are kept.

use crate::models::{NewsItem, Source};
use crate::utils::{cutoff, fetch_text, http_client, truncate_chars};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Maximum characters kept from an entry's description.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Which document shape the root element announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

impl FeedKind {
    fn from_root(name: &[u8]) -> Result<Self, Box<dyn Error>> {
        match name {
            b"rss" | b"RDF" => Ok(FeedKind::Rss),
            b"feed" => Ok(FeedKind::Atom),
            other => Err(format!("not a feed document: <{}>", String::from_utf8_lossy(other)).into()),
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            FeedKind::Rss => b"item",
            FeedKind::Atom => b"entry",
        }
    }

    fn field(self, name: &[u8]) -> Option<Field> {
        match (self, name) {
            (_, b"title") => Some(Field::Title),
            (FeedKind::Rss, b"link") => Some(Field::Link),
            (FeedKind::Rss, b"pubDate") | (FeedKind::Atom, b"published") => Some(Field::Published),
            (FeedKind::Rss, b"description") | (FeedKind::Atom, b"summary") => Some(Field::Summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Summary,
}

/// A feed entry in either shape, before validation.
#[derive(Debug, Default)]
struct FeedEntry {
    title: Option<String>,
    link: Option<String>,
    /// Set once an Atom link with no `rel` or `rel="alternate"` was taken.
    alternate_link: bool,
    published: Option<String>,
    summary: Option<String>,
}

impl FeedEntry {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Title => self.title = Some(value),
            Field::Link => self.link = Some(value),
            Field::Published => self.published = Some(value),
            Field::Summary => self.summary = Some(value),
        }
    }

    /// Offer an Atom `<link>`; the alternate link wins over any other.
    fn offer_atom_link(&mut self, link: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in link.attributes().flatten() {
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(attribute_text(&attr.value)),
                b"rel" => rel = Some(attribute_text(&attr.value)),
                _ => {}
            }
        }
        let Some(href) = href else {
            return;
        };
        let alternate = matches!(rel.as_deref(), None | Some("alternate"));
        if (alternate && !self.alternate_link) || self.link.is_none() {
            self.link = Some(href);
            self.alternate_link |= alternate;
        }
    }
}

fn attribute_text(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match unescape(&raw) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Text for an entity reference such as `amp` or `#x2019`.
fn resolve_reference(name: &str) -> String {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse().ok(),
        };
        return code.and_then(char::from_u32).map(String::from).unwrap_or_default();
    }
    match resolve_predefined_entity(name) {
        Some(text) => text.to_string(),
        None => format!("&{name};"),
    }
}

/// Date shapes seen in feeds, tried in order.
enum DatePattern {
    Rfc2822,
    Rfc3339,
    Offset(&'static str),
    /// No zone information; read as UTC.
    Naive(&'static str),
}

const DATE_PATTERNS: &[DatePattern] = &[
    DatePattern::Rfc2822,
    DatePattern::Offset("%a, %d %b %Y %H:%M:%S %z"),
    DatePattern::Rfc3339,
    DatePattern::Offset("%Y-%m-%dT%H:%M:%S%z"),
    DatePattern::Naive("%Y-%m-%dT%H:%M:%SZ"),
    DatePattern::Naive("%Y-%m-%dT%H:%M:%S"),
    DatePattern::Naive("%a, %d %b %Y %H:%M:%S GMT"),
    DatePattern::Naive("%a, %d %b %Y %H:%M:%S UTC"),
];

/// Parse a feed date with the first pattern that accepts it.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DATE_PATTERNS.iter().find_map(|pattern| match pattern {
        DatePattern::Rfc2822 => DateTime::parse_from_rfc2822(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        DatePattern::Rfc3339 => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        DatePattern::Offset(fmt) => DateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        DatePattern::Naive(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|dt| dt.and_utc()),
    })
}

/// Read the entries of an RSS or Atom document.
///
/// The shape is chosen by the root element. Field values keep the text of
/// any nested markup, so an HTML-bearing description reads as plain text
/// instead of failing the document.
fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let mut reader = Reader::from_str(xml);
    let mut kind: Option<FeedKind> = None;
    let mut depth = 0usize;
    let mut entries = Vec::new();
    let mut current: Option<(FeedEntry, usize)> = None;
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                let name = name.as_ref();
                let Some(feed) = kind else {
                    kind = Some(FeedKind::from_root(name)?);
                    continue;
                };
                if capture.is_some() {
                    continue;
                }
                if current.is_none() {
                    if name == feed.entry_tag() {
                        current = Some((FeedEntry::default(), depth));
                    }
                    continue;
                }
                let Some((entry, _)) = current.as_mut() else {
                    continue;
                };
                if feed == FeedKind::Atom && name == b"link" {
                    entry.offer_atom_link(&e);
                } else if let Some(field) = feed.field(name) {
                    capture = Some((field, depth));
                    text.clear();
                }
            }
            Event::Empty(e) => {
                if kind.is_none() {
                    kind = Some(FeedKind::from_root(e.local_name().as_ref())?);
                    continue;
                }
                if let (Some(FeedKind::Atom), Some((entry, _)), None) = (kind, current.as_mut(), capture) {
                    if e.local_name().as_ref() == b"link" {
                        entry.offer_atom_link(&e);
                    }
                }
            }
            Event::Text(e) if capture.is_some() => text.push_str(&String::from_utf8_lossy(&e)),
            Event::CData(e) if capture.is_some() => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) if capture.is_some() => {
                text.push_str(&resolve_reference(&String::from_utf8_lossy(&e)))
            }
            Event::End(_) => {
                if let Some((field, at)) = capture {
                    if at == depth {
                        if let Some((entry, _)) = current.as_mut() {
                            entry.set(field, text.trim().to_string());
                        }
                        capture = None;
                    }
                } else if current.as_ref().is_some_and(|(_, at)| *at == depth) {
                    if let Some((entry, _)) = current.take() {
                        entries.push(entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if kind.is_none() {
                    return Err("empty feed document".into());
                }
                if depth != 0 {
                    return Err("feed document ended inside an element".into());
                }
                break;
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// Turn a feed document into items, in feed order.
///
/// # Arguments
///
/// * `xml` - The raw feed document
/// * `source` - Label stamped on every item
/// * `feed_url` - Used to resolve relative entry links
/// * `not_before` - Entries dated strictly before this are dropped
/// * `limit` - Maximum number of items returned
pub fn parse_feed(
    xml: &str,
    source: &Source,
    feed_url: &Url,
    not_before: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let entries = parse_entries(xml)?;
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for entry in entries {
        if items.len() >= limit {
            break;
        }

        let title = entry.title.as_deref().map(str::trim).unwrap_or_default();
        let link = entry.link.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        let Ok(url) = feed_url.join(link) else {
            debug!(%link, "Skipping entry with unusable link");
            continue;
        };

        let published_at = entry.published.as_deref().and_then(parse_feed_date);
        if let Some(published) = published_at {
            if published < not_before {
                continue;
            }
        }

        if !seen.insert(url.to_string()) {
            continue;
        }

        let summary = entry
            .summary
            .as_deref()
            .map(|s| truncate_chars(s.trim(), SUMMARY_MAX_CHARS));
        items.push(
            NewsItem::new(source.clone(), title, url.to_string())
                .with_published_at(published_at)
                .with_summary(summary),
        );
    }

    Ok(items)
}

/// A feed to read, with its recency window and cap.
#[derive(Debug, Clone)]
pub struct RssFeed {
    pub source: Source,
    pub url: String,
    pub days: i64,
    pub limit: usize,
}

impl RssFeed {
    pub fn new(source: Source, url: impl Into<String>, days: i64, limit: usize) -> Self {
        Self {
            source,
            url: url.into(),
            days,
            limit,
        }
    }

    /// Fetch and parse the feed. Any failure is logged and yields an empty list.
    #[instrument(level = "info", skip(self), fields(source = %self.source, url = %self.url))]
    pub async fn collect(&self) -> Vec<NewsItem> {
        match self.fetch().await {
            Ok(items) => {
                info!(count = items.len(), "Collected feed entries");
                items
            }
            Err(e) => {
                error!(error = %e, "Feed collection failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let feed_url = Url::parse(&self.url)?;
        let client = http_client()?;
        let xml = fetch_text(&client, &self.url).await?;
        parse_feed(
            &xml,
            &self.source,
            &feed_url,
            cutoff(Utc::now(), self.days),
            self.limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn rss_doc(entries: &[(&str, &str, String)]) -> String {
        let items: String = entries
            .iter()
            .map(|(title, link, date)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate><description>About {title}</description></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Blog</title><link>https://openai.com/blog</link>{items}</channel></rss>"#
        )
    }

    fn feed_url() -> Url {
        Url::parse("https://openai.com/blog/rss.xml").unwrap()
    }

    #[test]
    fn test_parse_feed_date_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(parse_feed_date("Mon, 10 Mar 2025 12:00:00 GMT"), Some(expected));
        assert_eq!(parse_feed_date("Mon, 10 Mar 2025 12:00:00 UTC"), Some(expected));
        assert_eq!(parse_feed_date("Mon, 10 Mar 2025 21:00:00 +0900"), Some(expected));
        assert_eq!(parse_feed_date("2025-03-10T12:00:00Z"), Some(expected));
        assert_eq!(parse_feed_date("2025-03-10T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_feed_date("2025-03-10T12:00:00"), Some(expected));
        assert_eq!(parse_feed_date("last tuesday"), None);
    }

    #[test]
    fn test_parse_rss_filters_stale_and_keeps_undated() {
        let now = Utc::now();
        let xml = rss_doc(&[
            ("Fresh post", "https://openai.com/index/fresh", (now - Duration::days(1)).to_rfc2822()),
            ("Old post", "https://openai.com/index/old", (now - Duration::days(30)).to_rfc2822()),
            ("Undated post", "https://openai.com/index/undated", "sometime".to_string()),
        ]);

        let items = parse_feed(&xml, &Source::OpenAi, &feed_url(), cutoff(now, 7), 5).unwrap();

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh post", "Undated post"]);
        assert!(items[0].published_at.is_some());
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn test_parse_rss_respects_limit_and_skips_incomplete() {
        let now = Utc::now();
        let date = now.to_rfc2822();
        let xml = rss_doc(&[
            ("", "https://openai.com/index/no-title", date.clone()),
            ("One", "https://openai.com/index/1", date.clone()),
            ("Two", "https://openai.com/index/2", date.clone()),
            ("Three", "https://openai.com/index/3", date),
        ]);

        let items = parse_feed(&xml, &Source::OpenAi, &feed_url(), cutoff(now, 7), 2).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "One");
        assert_eq!(items[1].title, "Two");
    }

    #[test]
    fn test_parse_atom_entries() {
        let published = Utc::now().to_rfc3339();
        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <entry>
    <title type="text">Atom &amp; friends</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="/posts/atom"/>
    <published>{published}</published>
    <summary>Short summary</summary>
  </entry>
</feed>"#
        );
        let url = Url::parse("https://example.com/feed.atom").unwrap();

        let items = parse_feed(&xml, &Source::from("Example"), &url, cutoff(Utc::now(), 7), 5).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom & friends");
        assert_eq!(items[0].url, "https://example.com/posts/atom");
        assert_eq!(items[0].summary.as_deref(), Some("Short summary"));
    }

    #[test]
    fn test_summary_is_truncated() {
        let long = "x".repeat(800);
        let xml = format!(
            "<rss><channel><item><title>Long</title><link>https://openai.com/l</link><description>{long}</description></item></channel></rss>"
        );
        let items = parse_feed(&xml, &Source::OpenAi, &feed_url(), cutoff(Utc::now(), 7), 5).unwrap();
        assert_eq!(items[0].summary.as_ref().map(|s| s.chars().count()), Some(SUMMARY_MAX_CHARS));
    }

    #[test]
    fn test_stale_entry_with_utc_zone_is_dropped() {
        let now = Utc::now();
        let old = (now - Duration::days(30)).format("%a, %d %b %Y %H:%M:%S UTC").to_string();
        let xml = rss_doc(&[
            ("Old post", "https://openai.com/index/old", old),
            ("Fresh post", "https://openai.com/index/fresh", now.to_rfc2822()),
        ]);

        let items = parse_feed(&xml, &Source::OpenAi, &feed_url(), cutoff(now, 7), 5).unwrap();

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh post"]);
    }

    #[test]
    fn test_markup_in_description_keeps_every_item() {
        let date = Utc::now().to_rfc2822();
        let xml = format!(
            r#"<rss version="2.0"><channel><title>Blog</title>
<item><title>Good</title><link>https://openai.com/index/good</link><pubDate>{date}</pubDate><description>Plain</description></item>
<item><title>Html desc</title><link>https://openai.com/index/html</link><pubDate>{date}</pubDate><description>Intro <b>bold</b> end</description></item>
<item><title>Wrapped</title><link>https://openai.com/index/cdata</link><description><![CDATA[<p>Inside &amp; out</p>]]></description></item>
</channel></rss>"#
        );

        let items = parse_feed(&xml, &Source::OpenAi, &feed_url(), cutoff(Utc::now(), 7), 5).unwrap();

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Good", "Html desc", "Wrapped"]);
        assert_eq!(items[1].summary.as_deref(), Some("Intro bold end"));
        assert_eq!(items[2].summary.as_deref(), Some("<p>Inside &amp; out</p>"));
    }

    #[test]
    fn test_channel_fields_are_not_entries() {
        let xml = "<rss><channel><title>Blog</title><link>https://openai.com/blog</link></channel></rss>";
        let items = parse_feed(xml, &Source::OpenAi, &feed_url(), Utc::now(), 5).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_non_feed_document_is_an_error() {
        let html = "<html><body><item><title>x</title><link>https://a.dev</link></item></body></html>";
        assert!(parse_feed(html, &Source::OpenAi, &feed_url(), Utc::now(), 5).is_err());
        assert!(parse_feed("", &Source::OpenAi, &feed_url(), Utc::now(), 5).is_err());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let result = parse_feed("<rss><channel><item>", &Source::OpenAi, &feed_url(), Utc::now(), 5);
        assert!(result.is_err());
        let mismatched = "<rss><channel><item><title>A</b></item></channel></rss>";
        assert!(parse_feed(mismatched, &Source::OpenAi, &feed_url(), Utc::now(), 5).is_err());
    }

    #[tokio::test]
    async fn test_collect_returns_window_entries_in_feed_order() {
        let now = Utc::now();
        let xml = rss_doc(&[
            ("Newest", "https://openai.com/index/a", (now - Duration::hours(5)).to_rfc2822()),
            ("Too old", "https://openai.com/index/b", (now - Duration::days(20)).to_rfc2822()),
            ("Middle", "https://openai.com/index/c", (now - Duration::days(3)).to_rfc2822()),
        ]);
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/blog/rss.xml")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(xml)
            .expect(2)
            .create_async()
            .await;

        let feed = RssFeed::new(Source::OpenAi, format!("{}/blog/rss.xml", server.url()), 7, 5);
        let first = feed.collect().await;
        let second = feed.collect().await;

        let titles: Vec<_> = first.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Middle"]);
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_collect_on_server_error_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rss.xml")
            .with_status(503)
            .create_async()
            .await;

        let feed = RssFeed::new(Source::OpenAi, format!("{}/rss.xml", server.url()), 7, 5);
        assert!(feed.collect().await.is_empty());
    }
}
