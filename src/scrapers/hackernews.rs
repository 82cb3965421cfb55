//! Hacker News stories via the Algolia search API.
//!
//! Stories are requested for a creation-time window with
//! `numericFilters=created_at_i>=START,created_at_i<=END`, tagged `story`,
//! `hitsPerPage=limit`. Algolia ranks hits by relevance, which is not the
//! order we present, so results are re-sorted by points after mapping.

use crate::models::{Extras, NewsItem, Source};
use crate::utils::{cutoff, http_client, last_completed_week};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, error, info, instrument};

/// Base URL for discussion permalinks.
pub const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

/// Which creation-time window to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Monday 00:00 UTC through Sunday 23:59:59 UTC of the previous week.
    LastWeek,
    /// `now - days` through `now`.
    Days(i64),
}

impl Window {
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            Window::LastWeek => last_completed_week(now),
            Window::Days(days) => (cutoff(now, days), now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<i64>,
    num_comments: Option<i64>,
    created_at: Option<String>,
}

impl Hit {
    fn into_item(self) -> Option<NewsItem> {
        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return None;
        }
        let discussion_url = format!("{ITEM_URL}{}", self.object_id);
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| discussion_url.clone());

        Some(
            NewsItem::new(Source::HackerNews, title, url)
                .with_published_at(
                    self.created_at
                        .as_deref()
                        .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
                        .map(|c| c.with_timezone(&Utc)),
                )
                .with_extras(Extras {
                    score: Some(self.points.unwrap_or(0)),
                    comments: Some(self.num_comments.unwrap_or(0)),
                    discussion_url: Some(discussion_url),
                    ..Extras::default()
                }),
        )
    }
}

/// Map a search response body to items ordered by score, highest first.
pub fn parse_hits(body: &str, limit: usize) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let mut seen = HashSet::new();
    let mut items: Vec<NewsItem> = response
        .hits
        .into_iter()
        .filter_map(Hit::into_item)
        .filter(|item| seen.insert(item.url.clone()))
        .collect();

    items.sort_by(|a, b| b.extras.score.cmp(&a.extras.score));
    items.truncate(limit);
    Ok(items)
}

#[derive(Debug, Clone)]
pub struct HackerNews {
    pub endpoint: String,
    pub window: Window,
    pub limit: usize,
}

impl HackerNews {
    pub fn new(endpoint: impl Into<String>, window: Window, limit: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            window,
            limit,
        }
    }

    /// Search for top stories. Any failure is logged and yields an empty list.
    #[instrument(level = "info", skip(self), fields(window = ?self.window, limit = self.limit))]
    pub async fn collect(&self) -> Vec<NewsItem> {
        match self.fetch(Utc::now()).await {
            Ok(items) => {
                info!(count = items.len(), "Collected Hacker News stories");
                items
            }
            Err(e) => {
                error!(error = %e, "Hacker News search failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<Vec<NewsItem>, Box<dyn Error>> {
        let (start, end) = self.window.bounds(now);
        let numeric_filters = format!(
            "created_at_i>={},created_at_i<={}",
            start.timestamp(),
            end.timestamp()
        );
        debug!(%start, %end, %numeric_filters, "Searching stories");

        let client = http_client()?;
        let body = client
            .get(&self.endpoint)
            .query(&[
                ("tags", "story".to_string()),
                ("numericFilters", numeric_filters),
                ("hitsPerPage", self.limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_hits(&body, self.limit)
    }
}
