//! Anthropic newsroom scraper.
//!
//! The newsroom page at <https://www.anthropic.com/news> links every post with
//! a single-segment relative path such as `/news/claude-3-family`. The page
//! carries no publish dates, so this scraper applies no recency filter and
//! leaves `published_at` unset.

use crate::models::{NewsItem, Source};
use crate::scrapers::{Extraction, SkipReason, fold_extractions};
use crate::utils::{absolute_without_query, clean_text, fetch_text, http_client};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{error, info, instrument};
use url::Url;

/// Titles shorter than this are treated as icons or labels, not posts.
pub const MIN_TITLE_CHARS: usize = 5;

static ARTICLE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/news/[^/]+$").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4").unwrap());

/// Describe one candidate anchor.
fn extract(anchor: ElementRef<'_>, href: &str, base: &Url) -> Extraction {
    let Some(url) = absolute_without_query(base, href) else {
        return Extraction::Skip(SkipReason::MissingLink);
    };

    let mut title = clean_text(anchor.text());
    if title.chars().count() < MIN_TITLE_CHARS {
        if let Some(heading) = anchor.select(&HEADING_SELECTOR).next() {
            title = clean_text(heading.text());
        }
    }

    let len = title.chars().count();
    if len == 0 {
        Extraction::Skip(SkipReason::MissingTitle)
    } else if len < MIN_TITLE_CHARS {
        Extraction::Skip(SkipReason::TitleTooShort(len))
    } else {
        Extraction::Item(NewsItem::new(Source::Anthropic, title, url.to_string()))
    }
}

/// Pull article links out of the newsroom HTML, in page order.
pub fn parse_news_page(html: &str, base: &Url, limit: usize) -> Vec<NewsItem> {
    let document = Html::parse_document(html);
    let extractions = document.select(&LINK_SELECTOR).filter_map(|anchor| {
        let href = anchor.value().attr("href")?;
        ARTICLE_PATH
            .is_match(href)
            .then(|| extract(anchor, href, base))
    });
    fold_extractions(Source::Anthropic.label(), extractions, limit)
}

#[derive(Debug, Clone)]
pub struct AnthropicNews {
    pub page_url: Url,
    pub limit: usize,
}

impl AnthropicNews {
    pub fn new(page_url: Url, limit: usize) -> Self {
        Self { page_url, limit }
    }

    /// Scrape the newsroom. Any failure is logged and yields an empty list.
    #[instrument(level = "info", skip(self), fields(url = %self.page_url))]
    pub async fn collect(&self) -> Vec<NewsItem> {
        match self.fetch().await {
            Ok(items) => {
                info!(count = items.len(), "Collected Anthropic posts");
                items
            }
            Err(e) => {
                error!(error = %e, "Anthropic scrape failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let client = http_client()?;
        let html = fetch_text(&client, self.page_url.as_str()).await?;
        Ok(parse_news_page(&html, &self.page_url, self.limit))
    }
}
