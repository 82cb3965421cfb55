//! Medium tag listings, read through a headless browser.
//!
//! Medium renders its tag pages client-side, so this adapter loads
//! `https://medium.com/tag/{tag}` for each configured tag in a browser, waits
//! for rendering to settle, and reads `h2` headings as article titles.
//!
//! Titles are the identity here: the same story often appears under several
//! tags with different tracking links, so duplicates are detected by title
//! across the whole run. The overall `limit` ends both the per-tag scan and
//! the tag loop.

use crate::browser::{
    self, ACTION_TIMEOUT, BrowserCapability, PageRenderer, RenderOptions, RenderedHeading,
    SETTLE_DELAY, SessionCookie,
};
use crate::models::{Extras, NewsItem, Source};
use crate::scrapers::{Extraction, SkipReason};
use crate::utils::{USER_AGENT, absolute_without_query};
use std::collections::HashSet;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const MIN_TITLE_CHARS: usize = 15;

/// Default tags, scanned in order.
pub const DEFAULT_TAGS: [&str; 3] = ["technology", "artificial-intelligence", "programming"];

#[derive(Debug, Clone)]
pub struct MediumTags {
    pub base_url: Url,
    pub tags: Vec<String>,
    pub limit: usize,
    /// Value of Medium's `sid` cookie, for member-only listings.
    pub session_id: Option<String>,
    pub capability: BrowserCapability,
}

fn is_boilerplate(title: &str) -> bool {
    title.contains("Recommended") || title.to_lowercase().contains("stories in")
}

impl MediumTags {
    pub fn new(
        base_url: Url,
        tags: Vec<String>,
        limit: usize,
        session_id: Option<String>,
        capability: BrowserCapability,
    ) -> Self {
        Self {
            base_url,
            tags,
            limit,
            session_id,
            capability,
        }
    }

    pub fn tag_url(&self, tag: &str) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("tag/{}", urlencoding::encode(tag)))
    }

    fn render_options(&self) -> RenderOptions {
        let cookie_domain = self
            .base_url
            .host_str()
            .map(|host| format!(".{}", host.trim_start_matches("www.")))
            .unwrap_or_else(|| ".medium.com".to_string());
        RenderOptions {
            user_agent: USER_AGENT.to_string(),
            session_cookie: self.session_id.as_ref().map(|sid| SessionCookie {
                name: "sid".to_string(),
                value: sid.clone(),
                domain: cookie_domain,
                path: "/".to_string(),
            }),
            action_timeout: ACTION_TIMEOUT,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Launch a browser and scan every tag.
    ///
    /// Logs and returns nothing when no browser is available or it fails to
    /// launch.
    #[instrument(level = "info", skip(self), fields(tags = self.tags.len(), limit = self.limit))]
    pub async fn collect(&self) -> Vec<NewsItem> {
        if let BrowserCapability::Unavailable(reason) = &self.capability {
            warn!(%reason, "Headless browser unavailable; skipping Medium");
            return Vec::new();
        }
        match browser::launch(self.render_options()).await {
            Ok(renderer) => self.collect_with(renderer).await,
            Err(e) => {
                error!(error = %e, "Failed to launch browser");
                Vec::new()
            }
        }
    }

    /// Scan every tag with `renderer`, closing it before returning.
    pub async fn collect_with<R: PageRenderer>(&self, mut renderer: R) -> Vec<NewsItem> {
        let mut seen_titles = HashSet::new();
        let mut seen_urls = HashSet::new();
        let mut items = Vec::new();

        'tags: for tag in &self.tags {
            if items.len() >= self.limit {
                break;
            }
            let page = match self.tag_url(tag) {
                Ok(page) => page,
                Err(e) => {
                    warn!(%tag, error = %e, "Invalid tag URL");
                    continue;
                }
            };
            let headings = match renderer.headings(page.as_str()).await {
                Ok(headings) => headings,
                Err(e) => {
                    warn!(%tag, error = %e, "Failed to load tag page");
                    continue;
                }
            };
            debug!(%tag, count = headings.len(), "Read headings");

            for heading in headings {
                if items.len() >= self.limit {
                    break 'tags;
                }
                match self.extract(heading, tag, &mut seen_titles) {
                    Extraction::Item(item) if seen_urls.insert(item.url.clone()) => items.push(item),
                    Extraction::Item(item) => debug!(url = %item.url, "Skipping duplicate URL"),
                    Extraction::Skip(reason) => debug!(%tag, %reason, "Skipping heading"),
                }
            }
        }

        renderer.close().await;
        info!(count = items.len(), "Collected Medium articles");
        items
    }

    fn extract(
        &self,
        heading: Result<RenderedHeading, String>,
        tag: &str,
        seen_titles: &mut HashSet<String>,
    ) -> Extraction {
        let heading = match heading {
            Ok(heading) => heading,
            Err(e) => return Extraction::Skip(SkipReason::Unreadable(e)),
        };

        let title = heading.text.trim();
        let len = title.chars().count();
        if len == 0 {
            return Extraction::Skip(SkipReason::MissingTitle);
        }
        if len < MIN_TITLE_CHARS {
            return Extraction::Skip(SkipReason::TitleTooShort(len));
        }
        if is_boilerplate(title) {
            return Extraction::Skip(SkipReason::Boilerplate);
        }
        if !seen_titles.insert(title.to_string()) {
            return Extraction::Skip(SkipReason::DuplicateTitle);
        }

        let Some(url) = heading
            .href
            .as_deref()
            .and_then(|href| absolute_without_query(&self.base_url, href))
        else {
            return Extraction::Skip(SkipReason::MissingLink);
        };

        Extraction::Item(
            NewsItem::new(Source::Medium, title, url.to_string()).with_extras(Extras {
                topic: Some(tag.to_string()),
                ..Extras::default()
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::error::Error;
    use std::rc::Rc;

    type Page = Result<Vec<Result<RenderedHeading, String>>, String>;

    struct FakeRenderer {
        pages: HashMap<String, Page>,
        visited: Rc<Cell<usize>>,
        closed: Rc<Cell<bool>>,
    }

    impl PageRenderer for FakeRenderer {
        async fn headings(
            &mut self,
            url: &str,
        ) -> Result<Vec<Result<RenderedHeading, String>>, Box<dyn Error>> {
            self.visited.set(self.visited.get() + 1);
            match self.pages.get(url) {
                Some(Ok(headings)) => Ok(headings.clone()),
                Some(Err(e)) => Err(e.clone().into()),
                None => Err(format!("no page for {url}").into()),
            }
        }

        async fn close(self) {
            self.closed.set(true);
        }
    }

    fn heading(text: &str, href: &str) -> Result<RenderedHeading, String> {
        Ok(RenderedHeading {
            text: text.to_string(),
            href: Some(href.to_string()),
        })
    }

    fn adapter(limit: usize) -> MediumTags {
        MediumTags::new(
            Url::parse("https://medium.com/").unwrap(),
            DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            limit,
            None,
            BrowserCapability::Available,
        )
    }

    fn renderer(pages: Vec<(&str, Page)>) -> (FakeRenderer, Rc<Cell<usize>>, Rc<Cell<bool>>) {
        let visited = Rc::new(Cell::new(0));
        let closed = Rc::new(Cell::new(false));
        let fake = FakeRenderer {
            pages: pages.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            visited: visited.clone(),
            closed: closed.clone(),
        };
        (fake, visited, closed)
    }

    #[test]
    fn test_tag_url() {
        let a = adapter(10);
        assert_eq!(
            a.tag_url("artificial-intelligence").unwrap().as_str(),
            "https://medium.com/tag/artificial-intelligence"
        );
        assert_eq!(a.tag_url("c++").unwrap().as_str(), "https://medium.com/tag/c%2B%2B");
    }

    #[tokio::test]
    async fn test_collect_with_filters_and_dedupes_titles() {
        let (fake, _, closed) = renderer(vec![
            (
                "https://medium.com/tag/technology",
                Ok(vec![
                    heading("Recommended from Medium", "/x"),
                    heading("Short one", "/short"),
                    heading("Top stories in Technology", "/y"),
                    heading("Why Rust keeps winning developers", "/@a/rust-123?source=tag"),
                    Err("node detached".to_string()),
                    Ok(RenderedHeading {
                        text: "A heading with no link at all".to_string(),
                        href: None,
                    }),
                ]),
            ),
            ("https://medium.com/tag/artificial-intelligence", Err("timeout".to_string())),
            (
                "https://medium.com/tag/programming",
                Ok(vec![
                    heading("Why Rust keeps winning developers", "/@b/rust-456"),
                    heading("Designing APIs people enjoy using", "https://medium.com/@c/api?x=1"),
                ]),
            ),
        ]);

        let items = adapter(10).collect_with(fake).await;

        let got: Vec<_> = items
            .iter()
            .map(|i| (i.title.as_str(), i.url.as_str(), i.extras.topic.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                (
                    "Why Rust keeps winning developers",
                    "https://medium.com/@a/rust-123",
                    Some("technology")
                ),
                (
                    "Designing APIs people enjoy using",
                    "https://medium.com/@c/api",
                    Some("programming")
                ),
            ]
        );
        assert!(closed.get());
    }

    #[tokio::test]
    async fn test_limit_stops_all_tags() {
        let (fake, visited, closed) = renderer(vec![(
            "https://medium.com/tag/technology",
            Ok(vec![
                heading("First long enough article title", "/1"),
                heading("Second long enough article title", "/2"),
                heading("Third long enough article title", "/3"),
            ]),
        )]);

        let items = adapter(2).collect_with(fake).await;

        assert_eq!(items.len(), 2);
        assert_eq!(visited.get(), 1);
        assert!(closed.get());
    }

    #[tokio::test]
    async fn test_unavailable_capability_yields_nothing() {
        let mut a = adapter(10);
        a.capability = BrowserCapability::Unavailable("no chrome".to_string());
        assert!(a.collect().await.is_empty());
    }

    #[test]
    fn test_session_cookie_targets_medium_domain() {
        let mut a = adapter(10);
        a.session_id = Some("secret".to_string());
        let cookie = a.render_options().session_cookie.unwrap();
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.domain, ".medium.com");
        assert_eq!(cookie.path, "/");
    }
}
