//! Data models for collected news items.
//!
//! This module defines the one record every source adapter produces:
//! - [`Source`]: The label of the upstream a record came from
//! - [`NewsItem`]: A normalized news record
//! - [`Extras`]: Optional per-source attributes that ride along with an item
//!
//! Items live for a single run. Adapters own the lists they build until the
//! aggregator concatenates them, and the digest consumes that list once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The upstream a [`NewsItem`] was collected from.
///
/// Known sources have fixed display labels that also drive presentation
/// order. Anything else is carried as [`Source::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Source {
    Playwright,
    HackerNews,
    Tldr,
    OpenAi,
    Anthropic,
    Medium,
    Other(String),
}

impl Source {
    /// Fixed presentation order for known sources.
    pub const PREFERRED_ORDER: [Source; 6] = [
        Source::Playwright,
        Source::HackerNews,
        Source::Tldr,
        Source::OpenAi,
        Source::Anthropic,
        Source::Medium,
    ];

    /// Human readable label, e.g. `"Hacker News"`.
    pub fn label(&self) -> &str {
        match self {
            Source::Playwright => "Playwright",
            Source::HackerNews => "Hacker News",
            Source::Tldr => "TLDR",
            Source::OpenAi => "OpenAI",
            Source::Anthropic => "Anthropic",
            Source::Medium => "Medium",
            Source::Other(label) => label,
        }
    }

    /// Position in [`Source::PREFERRED_ORDER`], or `None` for unknown sources.
    pub fn preferred_rank(&self) -> Option<usize> {
        Self::PREFERRED_ORDER.iter().position(|s| s == self)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Source {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Playwright" => Source::Playwright,
            "Hacker News" => Source::HackerNews,
            "TLDR" => Source::Tldr,
            "OpenAI" => Source::OpenAi,
            "Anthropic" => Source::Anthropic,
            "Medium" => Source::Medium,
            _ => Source::Other(label),
        }
    }
}

impl From<&str> for Source {
    fn from(label: &str) -> Self {
        Source::from(label.to_string())
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.label().to_string()
    }
}

/// A normalized news record, the shape every adapter emits.
///
/// # Invariants
///
/// * `title` is non-empty and passed the adapter's minimum-length check
/// * `url` is absolute; tracking query strings are stripped where the
///   source adds them
/// * within one adapter's output no two items share a `url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub source: Source,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Short excerpt, already truncated by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extras: Extras,
}

impl NewsItem {
    pub fn new(source: Source, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            url: url.into(),
            published_at: None,
            summary: None,
            extras: Extras::default(),
        }
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Attach a summary; blank text is stored as `None`.
    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }
}

/// Source-specific attributes. All optional so the canonical record never
/// grows required per-source fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extras {
    /// Engagement score (Hacker News points).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    /// Permalink to the discussion thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussion_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_tag: Option<String>,
    /// Listing tag the item was found under (Medium).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Newsletter edition date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_date: Option<NaiveDate>,
}
