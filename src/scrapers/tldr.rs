//! TLDR Tech newsletter archive scraper.
//!
//! Every weekday edition lives at `https://tldr.tech/tech/YYYY-MM-DD`; no
//! editions are published on weekends. Outbound article links carry a
//! `utm_source=tldr...` marker, which is how articles are told apart from
//! navigation. Editorial order matters, so only the first few articles of
//! each edition are kept.

use crate::models::{Extras, NewsItem, Source};
use crate::scrapers::{Extraction, SkipReason, fold_extractions};
use crate::utils::{
    absolute_without_query, clean_text, fetch_text, http_client, latest_weekday, recent_weekdays,
    truncate_chars,
};
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

pub const MIN_TITLE_CHARS: usize = 10;
pub const SUMMARY_MAX_CHARS: usize = 500;
/// Marker carried by outbound article links.
pub const TRACKING_MARKER: &str = "utm_source=tldr";
/// Days before today checked for the latest edition.
pub const LATEST_LOOKBACK_DAYS: i64 = 3;
/// Publisher domain; links back to it are navigation, not articles.
pub const PUBLISHER_DOMAIN: &str = "tldr.tech";
/// Extra calendar days walked so weekends do not starve the recent window.
pub const LOOKBACK_BUFFER: usize = 7;

static READ_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d+\s*minute\s*read\)").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Which editions to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditionMode {
    /// The most recent weekday edition among today and the 3 days before.
    Latest,
    /// The last `days` weekday editions, newest first.
    Recent { days: usize },
}

/// Remove a `(N minute read)` marker, leaving the rest of the title as is.
pub fn strip_read_time(title: &str) -> String {
    READ_TIME.replace_all(title, "").trim().to_string()
}

fn on_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn same_site(url: &Url, page: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    on_domain(host, PUBLISHER_DOMAIN) || page.host_str().is_some_and(|page_host| on_domain(host, page_host))
}

fn summary_for(anchor: ElementRef<'_>) -> Option<String> {
    let nested = anchor.select(&PARAGRAPH_SELECTOR).next();
    let sibling = || {
        anchor
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|el| matches!(el.value().name(), "p" | "div"))
    };
    nested
        .or_else(sibling)
        .map(|el| truncate_chars(&clean_text(el.text()), SUMMARY_MAX_CHARS))
}

fn extract(anchor: ElementRef<'_>, href: &str, page: &Url, date: NaiveDate) -> Extraction {
    let Some(url) = absolute_without_query(page, href) else {
        return Extraction::Skip(SkipReason::MissingLink);
    };

    let title = match anchor.select(&TITLE_SELECTOR).next() {
        Some(heading) => clean_text(heading.text()),
        None => clean_text(anchor.text()),
    };
    let len = title.chars().count();
    if len == 0 {
        return Extraction::Skip(SkipReason::MissingTitle);
    }
    if len < MIN_TITLE_CHARS {
        return Extraction::Skip(SkipReason::TitleTooShort(len));
    }
    if title.contains("(Sponsor)") {
        return Extraction::Skip(SkipReason::Sponsored);
    }
    if same_site(&url, page) {
        return Extraction::Skip(SkipReason::SameSite);
    }

    Extraction::Item(
        NewsItem::new(Source::Tldr, strip_read_time(&title), url.to_string())
            .with_summary(summary_for(anchor))
            .with_extras(Extras {
                batch_date: Some(date),
                ..Extras::default()
            }),
    )
}

/// Extract up to `per_edition` articles from one edition page, in page order.
pub fn parse_edition(html: &str, page: &Url, date: NaiveDate, per_edition: usize) -> Vec<NewsItem> {
    let document = Html::parse_document(html);
    let extractions = document.select(&LINK_SELECTOR).filter_map(|anchor| {
        let href = anchor.value().attr("href")?;
        href.contains(TRACKING_MARKER)
            .then(|| extract(anchor, href, page, date))
    });
    fold_extractions(Source::Tldr.label(), extractions, per_edition)
}

#[derive(Debug, Clone)]
pub struct Tldr {
    /// Archive root; editions are resolved as `{base}{YYYY-MM-DD}`.
    pub base_url: Url,
    pub mode: EditionMode,
    pub per_edition: usize,
}

impl Tldr {
    pub fn new(base_url: Url, mode: EditionMode, per_edition: usize) -> Self {
        Self {
            base_url,
            mode,
            per_edition,
        }
    }

    /// Edition URL for a given date.
    pub fn edition_url(&self, date: NaiveDate) -> Result<Url, url::ParseError> {
        self.base_url.join(&date.format("%Y-%m-%d").to_string())
    }

    /// Dates whose editions are read, newest first.
    pub fn edition_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        match self.mode {
            EditionMode::Latest => latest_weekday(today, LATEST_LOOKBACK_DAYS).into_iter().collect(),
            EditionMode::Recent { days } => recent_weekdays(today, days, LOOKBACK_BUFFER),
        }
    }

    /// Collect from the editions ending today (local time).
    pub async fn collect(&self) -> Vec<NewsItem> {
        self.collect_on(Local::now().date_naive()).await
    }

    /// Collect from the editions ending on `today`.
    ///
    /// A failed edition is logged and skipped. An article already taken from
    /// a newer edition is dropped from older ones.
    #[instrument(level = "info", skip(self), fields(mode = ?self.mode))]
    pub async fn collect_on(&self, today: NaiveDate) -> Vec<NewsItem> {
        let client = match http_client() {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Failed to build HTTP client");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for date in self.edition_dates(today) {
            match self.fetch_edition(&client, date).await {
                Ok(edition) => {
                    info!(%date, count = edition.len(), "Parsed TLDR edition");
                    items.extend(
                        edition
                            .into_iter()
                            .filter(|item| seen.insert(item.url.clone())),
                    );
                }
                Err(e) => warn!(%date, error = %e, "Failed to fetch TLDR edition"),
            }
        }
        info!(count = items.len(), "Collected TLDR articles");
        items
    }

    async fn fetch_edition(&self, client: &Client, date: NaiveDate) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let page = self.edition_url(date)?;
        let html = fetch_text(client, page.as_str()).await?;
        Ok(parse_edition(&html, &page, date, self.per_edition))
    }
}
