//! GitHub releases for a single project (Playwright by default).
//!
//! Only the API's first page is read. The recency window is applied inside
//! the first `limit` releases, so older releases in that slice shrink the
//! result rather than pulling in more from further down the list.

use crate::models::{Extras, NewsItem, Source};
use crate::utils::{cutoff, http_client, truncate_chars};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use tracing::{error, info, instrument};

/// Maximum characters kept from a release body.
pub const BODY_MAX_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct Release {
    name: Option<String>,
    tag_name: Option<String>,
    html_url: Option<String>,
    published_at: Option<String>,
    body: Option<String>,
}

/// GitHub timestamps look like `2025-03-10T12:00:00Z`.
pub fn parse_github_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|dt| dt.and_utc())
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Map a release-list body to items.
pub fn parse_releases(
    body: &str,
    source: &Source,
    not_before: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let releases: Vec<Release> = serde_json::from_str(body)?;
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for release in releases.into_iter().take(limit) {
        let published_at = release.published_at.as_deref().and_then(parse_github_date);
        if published_at.is_some_and(|p| p < not_before) {
            continue;
        }

        let tag = non_blank(release.tag_name);
        let Some(title) = non_blank(release.name).or_else(|| tag.clone()) else {
            continue;
        };
        let Some(url) = non_blank(release.html_url) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let body = release.body.map(|b| truncate_chars(&b, BODY_MAX_CHARS));
        items.push(
            NewsItem::new(source.clone(), title, url)
                .with_published_at(published_at)
                .with_summary(body)
                .with_extras(Extras {
                    release_tag: tag,
                    ..Extras::default()
                }),
        );
    }

    Ok(items)
}

#[derive(Debug, Clone)]
pub struct GithubReleases {
    pub source: Source,
    pub endpoint: String,
    pub days: i64,
    pub limit: usize,
}

impl GithubReleases {
    pub fn new(source: Source, endpoint: impl Into<String>, days: i64, limit: usize) -> Self {
        Self {
            source,
            endpoint: endpoint.into(),
            days,
            limit,
        }
    }

    /// Fetch recent releases. Any failure is logged and yields an empty list.
    #[instrument(level = "info", skip(self), fields(source = %self.source, url = %self.endpoint))]
    pub async fn collect(&self) -> Vec<NewsItem> {
        match self.fetch().await {
            Ok(items) => {
                info!(count = items.len(), "Collected releases");
                items
            }
            Err(e) => {
                error!(error = %e, "Release fetch failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let client = http_client()?;
        let body = client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_releases(
            &body,
            &self.source,
            cutoff(Utc::now(), self.days),
            self.limit,
        )
    }
}
