//! Headless browser capability with a feature-gated implementation.
//!
//! Some listings only render client-side, so they are read through a real
//! browser. When the `browser` feature is enabled, [`ChromiumRenderer`] drives
//! a local Chrome/Chromium over the DevTools protocol via `chromiumoxide`.
//! When disabled, [`detect`] always reports the capability as unavailable and
//! [`launch`] always fails, so callers never need `#[cfg]` themselves.
//!
//! # Feature Flag
//!
//! Enable with: `cargo build --features browser`
//!
//! Requires a Chrome or Chromium executable on the host.

use std::error::Error;
use std::time::Duration;

/// Per-action timeout for navigation and DevTools calls.
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(15);
/// Time allowed for client-side rendering after navigation.
pub const SETTLE_DELAY: Duration = Duration::from_secs(4);

/// Result of checking for a usable browser, made once at adapter construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCapability {
    Available,
    Unavailable(String),
}

/// A cookie attached to the browsing context before any navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub user_agent: String,
    pub session_cookie: Option<SessionCookie>,
    pub action_timeout: Duration,
    pub settle_delay: Duration,
}

/// A heading read from a rendered page, with its enclosing link if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHeading {
    pub text: String,
    pub href: Option<String>,
}

/// A rendered-page reader.
///
/// `headings` fails as a whole only when the page itself cannot be loaded.
/// Individual headings that cannot be read come back as `Err` entries.
pub trait PageRenderer {
    async fn headings(
        &mut self,
        url: &str,
    ) -> Result<Vec<Result<RenderedHeading, String>>, Box<dyn Error>>;

    /// Release the browser. Called once, before the adapter returns.
    async fn close(self);
}

/// Check whether a browser can be launched.
#[cfg(feature = "browser")]
pub fn detect() -> BrowserCapability {
    match chromiumoxide::browser::BrowserConfig::builder().build() {
        Ok(_) => BrowserCapability::Available,
        Err(reason) => BrowserCapability::Unavailable(reason),
    }
}

/// Check whether a browser can be launched (always unavailable without the `browser` feature).
#[cfg(not(feature = "browser"))]
pub fn detect() -> BrowserCapability {
    BrowserCapability::Unavailable("built without the `browser` feature".to_string())
}

#[cfg(feature = "browser")]
pub use chromium::{ChromiumRenderer, launch};

#[cfg(feature = "browser")]
mod chromium {
    use super::{PageRenderer, RenderOptions, RenderedHeading};
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::network::CookieParam;
    use chromiumoxide::element::Element;
    use chromiumoxide::error::CdpError;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::error::Error;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};
    use tracing::{debug, instrument, warn};

    const CLOSEST_LINK_JS: &str =
        "function() { const a = this.closest('a'); return a ? a.href : ''; }";

    pub struct ChromiumRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
        page: Page,
        options: RenderOptions,
    }

    /// Launch a headless browser and prepare one page with the configured
    /// user agent and session cookie.
    #[instrument(level = "info", skip_all)]
    pub async fn launch(options: RenderOptions) -> Result<ChromiumRenderer, Box<dyn Error>> {
        let config = BrowserConfig::builder()
            .request_timeout(options.action_timeout)
            .build()?;
        let (browser, mut events) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.set_user_agent(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await?;
        if let Some(cookie) = &options.session_cookie {
            let param = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .build()?;
            page.set_cookie(param).await?;
            debug!(domain = %cookie.domain, "Session cookie attached");
        }

        Ok(ChromiumRenderer {
            browser,
            handler,
            page,
            options,
        })
    }

    async fn read_heading(element: &Element) -> Result<RenderedHeading, CdpError> {
        let text = element.inner_text().await?.unwrap_or_default();
        let href = element
            .call_js_fn(CLOSEST_LINK_JS, false)
            .await?
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|href| !href.is_empty());
        Ok(RenderedHeading { text, href })
    }

    impl PageRenderer for ChromiumRenderer {
        async fn headings(
            &mut self,
            url: &str,
        ) -> Result<Vec<Result<RenderedHeading, String>>, Box<dyn Error>> {
            timeout(self.options.action_timeout, self.page.goto(url)).await??;
            sleep(self.options.settle_delay).await;

            let elements = self.page.find_elements("h2").await?;
            let mut headings = Vec::with_capacity(elements.len());
            for element in &elements {
                headings.push(read_heading(element).await.map_err(|e| e.to_string()));
            }
            Ok(headings)
        }

        async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                warn!(error = %e, "Browser did not close cleanly");
            }
            let _ = self.browser.wait().await;
            self.handler.abort();
        }
    }
}

/// Stand-in renderer type when the `browser` feature is disabled. It has no
/// values, so [`launch`] can only fail.
#[cfg(not(feature = "browser"))]
#[derive(Debug)]
pub enum ChromiumRenderer {}

#[cfg(not(feature = "browser"))]
impl PageRenderer for ChromiumRenderer {
    async fn headings(
        &mut self,
        _url: &str,
    ) -> Result<Vec<Result<RenderedHeading, String>>, Box<dyn Error>> {
        match *self {}
    }

    async fn close(self) {
        match self {}
    }
}

/// Launch a headless browser (always fails without the `browser` feature).
#[cfg(not(feature = "browser"))]
pub async fn launch(_options: RenderOptions) -> Result<ChromiumRenderer, Box<dyn Error>> {
    Err("built without the `browser` feature".into())
}
