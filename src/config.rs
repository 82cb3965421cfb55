//! Run configuration: the CLI/environment values plus the per-source table.
//!
//! The per-source table comes from an optional YAML file. Any key left out
//! keeps its built-in default, so an empty file (or no file) yields the
//! standard six sources.
//!
//! ```yaml
//! hackernews:
//!   window: days
//!   days: 3
//! tldr:
//!   mode: latest
//! medium:
//!   enabled: false
//! feeds:
//!   - label: Rust Blog
//!     url: https://blog.rust-lang.org/feed.xml
//! ```

use crate::browser::BrowserCapability;
use crate::cli::Cli;
use crate::models::Source;
use crate::outputs::email::parse_recipients;
use crate::scrapers::{
    Adapter, anthropic::AnthropicNews, github_releases::GithubReleases, hackernews, medium,
    rss::RssFeed, tldr,
};
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReleasesSettings {
    pub enabled: bool,
    pub url: String,
    pub days: i64,
    pub limit: usize,
}

impl Default for ReleasesSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://api.github.com/repos/microsoft/playwright/releases".to_string(),
            days: 7,
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    LastWeek,
    Days,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub enabled: bool,
    pub url: String,
    pub window: WindowKind,
    /// Only used with `window: days`.
    pub days: i64,
    pub limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://hn.algolia.com/api/v1/search".to_string(),
            window: WindowKind::LastWeek,
            days: 7,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditionKind {
    Latest,
    Recent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewsletterSettings {
    pub enabled: bool,
    /// Archive root; must end with `/`.
    pub url: String,
    pub mode: EditionKind,
    /// Weekdays read in `recent` mode.
    pub days: usize,
    pub per_edition: usize,
}

impl Default for NewsletterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://tldr.tech/tech/".to_string(),
            mode: EditionKind::Recent,
            days: 7,
            per_edition: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub enabled: bool,
    pub url: String,
    pub days: i64,
    pub limit: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://openai.com/blog/rss.xml".to_string(),
            days: 7,
            limit: 5,
        }
    }
}

/// An additional feed under its own source label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtraFeed {
    pub label: String,
    pub url: String,
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_days() -> i64 {
    7
}

fn default_feed_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub enabled: bool,
    pub url: String,
    pub limit: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://www.anthropic.com/news".to_string(),
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediumSettings {
    pub enabled: bool,
    pub url: String,
    pub tags: Vec<String>,
    pub limit: usize,
}

impl Default for MediumSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://medium.com/".to_string(),
            tags: medium::DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            limit: 10,
        }
    }
}

/// Per-source settings, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub playwright: ReleasesSettings,
    pub hackernews: SearchSettings,
    pub tldr: NewsletterSettings,
    pub openai: FeedSettings,
    pub anthropic: ScrapeSettings,
    pub medium: MediumSettings,
    pub feeds: Vec<ExtraFeed>,
}

impl SourcesConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        // An empty document deserializes as unit, not as a map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    /// Build every enabled adapter in collection order.
    ///
    /// `detect_browser` is called once, and only when the Medium source is enabled.
    pub fn adapters(
        &self,
        medium_session_id: Option<&str>,
        detect_browser: impl FnOnce() -> BrowserCapability,
    ) -> Result<Vec<Adapter>, Box<dyn Error>> {
        let mut adapters = Vec::new();

        let pw = &self.playwright;
        if pw.enabled {
            adapters.push(Adapter::Releases(GithubReleases::new(
                Source::Playwright,
                pw.url.clone(),
                pw.days,
                pw.limit,
            )));
        }

        let hn = &self.hackernews;
        if hn.enabled {
            let window = match hn.window {
                WindowKind::LastWeek => hackernews::Window::LastWeek,
                WindowKind::Days => hackernews::Window::Days(hn.days),
            };
            adapters.push(Adapter::Search(hackernews::HackerNews::new(
                hn.url.clone(),
                window,
                hn.limit,
            )));
        }

        let nl = &self.tldr;
        if nl.enabled {
            let mode = match nl.mode {
                EditionKind::Latest => tldr::EditionMode::Latest,
                EditionKind::Recent => tldr::EditionMode::Recent { days: nl.days },
            };
            adapters.push(Adapter::Newsletter(tldr::Tldr::new(
                Url::parse(&nl.url)?,
                mode,
                nl.per_edition,
            )));
        }

        let feed = &self.openai;
        if feed.enabled {
            adapters.push(Adapter::Feed(RssFeed::new(
                Source::OpenAi,
                feed.url.clone(),
                feed.days,
                feed.limit,
            )));
        }

        let scrape = &self.anthropic;
        if scrape.enabled {
            adapters.push(Adapter::Scrape(AnthropicNews::new(
                Url::parse(&scrape.url)?,
                scrape.limit,
            )));
        }

        let md = &self.medium;
        if md.enabled {
            let capability = detect_browser();
            debug!(?capability, "Browser capability detected");
            adapters.push(Adapter::Rendered(medium::MediumTags::new(
                Url::parse(&md.url)?,
                md.tags.clone(),
                md.limit,
                medium_session_id.map(str::to_string),
                capability,
            )));
        }

        for extra in &self.feeds {
            adapters.push(Adapter::Feed(RssFeed::new(
                Source::from(extra.label.as_str()),
                extra.url.clone(),
                extra.days,
                extra.limit,
            )));
        }

        Ok(adapters)
    }
}

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub sources: SourcesConfig,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_endpoint: String,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub email_to: Vec<String>,
    pub medium_session_id: Option<String>,
    pub dry_run: bool,
    pub test_email: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, Box<dyn Error>> {
        let sources = match &cli.config {
            Some(path) => {
                let sources = SourcesConfig::load(Path::new(path))?;
                info!(%path, "Loaded source configuration");
                sources
            }
            None => SourcesConfig::default(),
        };

        Ok(Self {
            sources,
            openai_api_key: non_blank(cli.openai_api_key),
            openai_model: cli.openai_model,
            openai_endpoint: cli.openai_endpoint,
            resend_api_key: non_blank(cli.resend_api_key),
            email_from: cli.email_from,
            email_to: parse_recipients(&cli.email_to),
            medium_session_id: non_blank(cli.medium_session_id),
            dry_run: cli.dry_run,
            test_email: cli.test_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let sources = SourcesConfig::from_yaml("").unwrap();
        assert_eq!(sources, SourcesConfig::default());
        assert_eq!(sources.hackernews.limit, 20);
        assert_eq!(sources.tldr.per_edition, 3);
        assert_eq!(sources.medium.tags.len(), 3);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let sources = SourcesConfig::from_yaml(
            r#"
hackernews:
  window: days
  days: 3
tldr:
  mode: latest
medium:
  enabled: false
feeds:
  - label: Rust Blog
    url: https://blog.rust-lang.org/feed.xml
"#,
        )
        .unwrap();

        assert_eq!(sources.hackernews.window, WindowKind::Days);
        assert_eq!(sources.hackernews.days, 3);
        assert_eq!(sources.hackernews.limit, 20);
        assert_eq!(sources.tldr.mode, EditionKind::Latest);
        assert!(!sources.medium.enabled);
        assert_eq!(sources.feeds[0].days, 7);
        assert_eq!(sources.feeds[0].limit, 5);
    }

    #[test]
    fn test_unknown_window_is_error() {
        assert!(SourcesConfig::from_yaml("hackernews:\n  window: fortnight\n").is_err());
    }

    #[test]
    fn test_adapters_in_collection_order() {
        let mut sources = SourcesConfig::from_yaml(
            "feeds:\n  - label: Rust Blog\n    url: https://blog.rust-lang.org/feed.xml\n",
        )
        .unwrap();
        let adapters = sources
            .adapters(None, || BrowserCapability::Unavailable("test".to_string()))
            .unwrap();
        let names: Vec<_> = adapters.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["Playwright", "Hacker News", "TLDR", "OpenAI", "Anthropic", "Medium", "Rust Blog"]
        );

        sources.medium.enabled = false;
        let adapters = sources
            .adapters(None, || panic!("browser detection must not run for a disabled source"))
            .unwrap();
        assert_eq!(adapters.len(), 6);
    }

    #[test]
    fn test_invalid_url_is_error() {
        let sources = SourcesConfig::from_yaml("anthropic:\n  url: not a url\n").unwrap();
        assert!(sources.adapters(None, || BrowserCapability::Available).is_err());
    }

    #[test]
    fn test_config_from_cli() {
        let cli = Cli::parse_from([
            "briefit",
            "--email-to",
            "a@x.dev, b@x.dev",
            "--resend-api-key",
            "  ",
            "--dry-run",
        ]);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.email_to, vec!["a@x.dev", "b@x.dev"]);
        assert!(config.resend_api_key.is_none());
        assert!(config.dry_run);
        assert_eq!(config.sources, SourcesConfig::default());
    }
}
