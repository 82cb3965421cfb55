//! News source adapters.
//!
//! Each adapter fetches one upstream and emits canonical [`NewsItem`]s. An
//! adapter never fails outward: transport or parse failures are logged and
//! reduced to an empty list inside the adapter's own `collect`.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Playwright | [`github_releases`] | GitHub releases API | Recency window over the first `limit` releases |
//! | Hacker News | [`hackernews`] | Algolia search API | Re-sorted by score |
//! | TLDR | [`tldr`] | HTML scraping | Weekday editions only |
//! | OpenAI | [`rss`] | RSS / Atom | Any feed URL works |
//! | Anthropic | [`anthropic`] | HTML scraping | No publish dates available |
//! | Medium | [`medium`] | Headless browser | Needs the `browser` feature |
//!
//! # Common Patterns
//!
//! HTML adapters describe each candidate element as an [`Extraction`] and
//! hand the sequence to [`fold_extractions`], which applies the result cap
//! and URL uniqueness in one place.

use crate::models::NewsItem;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument};

pub mod anthropic;
pub mod github_releases;
pub mod hackernews;
pub mod medium;
pub mod rss;
pub mod tldr;

/// Why a candidate element did not become an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    TitleTooShort(usize),
    MissingLink,
    DuplicateTitle,
    Sponsored,
    SameSite,
    Boilerplate,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => f.write_str("missing title"),
            SkipReason::TitleTooShort(len) => write!(f, "title too short ({len} chars)"),
            SkipReason::MissingLink => f.write_str("missing link"),
            SkipReason::DuplicateTitle => f.write_str("duplicate title"),
            SkipReason::Sponsored => f.write_str("sponsored entry"),
            SkipReason::SameSite => f.write_str("self-referential link"),
            SkipReason::Boilerplate => f.write_str("non-article heading"),
            SkipReason::Unreadable(e) => write!(f, "unreadable element: {e}"),
        }
    }
}

/// Outcome of turning one upstream element into an item.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Item(NewsItem),
    Skip(SkipReason),
}

/// Collect items from `extractions` until `limit` is reached.
///
/// Skips are logged and dropped. Items whose URL was already emitted by this
/// fold are dropped too, so the output holds pairwise-distinct URLs.
pub fn fold_extractions(
    source: &str,
    extractions: impl IntoIterator<Item = Extraction>,
    limit: usize,
) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for extraction in extractions {
        if items.len() >= limit {
            break;
        }
        match extraction {
            Extraction::Item(item) => {
                if seen.insert(item.url.clone()) {
                    items.push(item);
                } else {
                    debug!(source, url = %item.url, "Skipping duplicate URL");
                }
            }
            Extraction::Skip(reason) => debug!(source, %reason, "Skipping element"),
        }
    }
    items
}

/// An enabled source, ready to collect.
#[derive(Debug)]
pub enum Adapter {
    Releases(github_releases::GithubReleases),
    Search(hackernews::HackerNews),
    Newsletter(tldr::Tldr),
    Feed(rss::RssFeed),
    Scrape(anthropic::AnthropicNews),
    Rendered(medium::MediumTags),
}

impl Adapter {
    pub fn name(&self) -> &str {
        match self {
            Adapter::Releases(a) => a.source.label(),
            Adapter::Search(_) => "Hacker News",
            Adapter::Newsletter(_) => "TLDR",
            Adapter::Feed(a) => a.source.label(),
            Adapter::Scrape(_) => "Anthropic",
            Adapter::Rendered(_) => "Medium",
        }
    }

    /// Run the adapter. Failures have already been reduced to an empty list.
    pub async fn collect(&self) -> Vec<NewsItem> {
        match self {
            Adapter::Releases(a) => a.collect().await,
            Adapter::Search(a) => a.collect().await,
            Adapter::Newsletter(a) => a.collect().await,
            Adapter::Feed(a) => a.collect().await,
            Adapter::Scrape(a) => a.collect().await,
            Adapter::Rendered(a) => a.collect().await,
        }
    }
}

/// Run every adapter in order and concatenate their output.
#[instrument(level = "info", skip_all, fields(adapters = adapters.len()))]
pub async fn collect_all(adapters: &[Adapter]) -> Vec<NewsItem> {
    let mut news = Vec::new();
    for adapter in adapters {
        let items = adapter.collect().await;
        info!(source = adapter.name(), count = items.len(), "Collected");
        news.extend(items);
    }
    info!(count = news.len(), "Collection finished");
    news
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use url::Url;

    fn item(url: &str) -> Extraction {
        Extraction::Item(NewsItem::new(Source::Anthropic, "A long enough title", url))
    }

    #[test]
    fn test_fold_caps_and_dedupes() {
        let extractions = vec![
            item("https://a.dev/1"),
            Extraction::Skip(SkipReason::MissingTitle),
            item("https://a.dev/1"),
            item("https://a.dev/2"),
            item("https://a.dev/3"),
        ];
        let items = fold_extractions("test", extractions, 2);
        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.dev/1", "https://a.dev/2"]);
    }

    #[test]
    fn test_fold_with_zero_limit() {
        assert!(fold_extractions("test", vec![item("https://a.dev/1")], 0).is_empty());
    }

    #[tokio::test]
    async fn test_failing_adapter_does_not_abort_collection() {
        let mut server = mockito::Server::new_async().await;
        let broken_feed = server
            .mock("GET", "/feed.xml")
            .with_status(500)
            .create_async()
            .await;
        let search = server
            .mock("GET", "/api/v1/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"hits": [
                    {"objectID": "1", "title": "First story", "url": "https://a.dev/1", "points": 3, "num_comments": 1},
                    {"objectID": "2", "title": "Second story", "url": "https://a.dev/2", "points": 9, "num_comments": 0}
                ]}"#,
            )
            .create_async()
            .await;

        let adapters = vec![
            Adapter::Feed(rss::RssFeed::new(
                Source::OpenAi,
                format!("{}/feed.xml", server.url()),
                7,
                5,
            )),
            Adapter::Search(hackernews::HackerNews::new(
                format!("{}/api/v1/search", server.url()),
                hackernews::Window::Days(7),
                20,
            )),
        ];

        let news = collect_all(&adapters).await;

        assert_eq!(news.len(), 2);
        assert!(news.iter().all(|n| n.source == Source::HackerNews));
        assert_eq!(news[0].url, "https://a.dev/2");
        broken_feed.assert_async().await;
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_scrape_yields_nothing() {
        let adapter = Adapter::Scrape(anthropic::AnthropicNews::new(
            Url::parse("http://127.0.0.1:9/news").unwrap(),
            5,
        ));
        assert!(adapter.collect().await.is_empty());
    }
}
