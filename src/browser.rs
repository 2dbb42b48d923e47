use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::headers::HeaderPool;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const ARTICLE_POLL: Duration = Duration::from_millis(250);

const STEALTH_JS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    window.chrome = { runtime: {} };
"#;

const SCROLL_TO_MIDDLE: &str = "window.scrollTo(0, document.body.scrollHeight / 2);";

/// Produces the DOM of a page after client-side scripts have run.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<String>;
}

/// Used when the browser is switched off in configuration.
pub struct DisabledRenderer;

#[async_trait]
impl Renderer for DisabledRenderer {
    async fn render(&self, _url: &Url) -> Result<String> {
        Err(ScrapeError::Browser("browser rendering is disabled".into()))
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub headless: bool,
    pub article_wait: Duration,
    pub fallback_wait: Duration,
    pub settle: Duration,
    pub chrome_executable: Option<String>,
}

impl From<&ScraperConfig> for RenderOptions {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            headless: config.browser_headless,
            article_wait: config.browser_wait(),
            fallback_wait: config.browser_fallback_wait(),
            settle: config.browser_settle(),
            chrome_executable: config.chrome_executable.clone(),
        }
    }
}

/// Headless Chrome driven over CDP. Every render launches its own browser.
pub struct ChromeRenderer {
    options: RenderOptions,
    headers: Arc<HeaderPool>,
}

impl ChromeRenderer {
    pub fn new(options: RenderOptions, headers: Arc<HeaderPool>) -> Self {
        Self { options, headers }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg(format!("--user-agent={}", self.headers.random_user_agent()));

        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to build browser config: {}", e)))
    }

    async fn capture(&self, session: &BrowserSession, url: &Url) -> Result<String> {
        let page = session.browser.new_page("about:blank").await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
            .await?;
        page.goto(url.as_str()).await?;

        if !wait_for_article(&page, self.options.article_wait).await {
            debug!("No <article> after {:?}, waiting a fixed interval", self.options.article_wait);
            tokio::time::sleep(self.options.fallback_wait).await;
        }

        page.evaluate(SCROLL_TO_MIDDLE).await?;
        tokio::time::sleep(self.options.settle).await;

        Ok(page.content().await?)
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &Url) -> Result<String> {
        let session = BrowserSession::launch(self.browser_config()?).await?;
        let outcome = self.capture(&session, url).await;
        session.close().await;
        if let Ok(html) = &outcome {
            info!("Rendered {} ({} bytes)", url, html.len());
        }
        outcome
    }
}

async fn wait_for_article(page: &Page, wait: Duration) -> bool {
    tokio::time::timeout(wait, async {
        while page.find_element("article").await.is_err() {
            tokio::time::sleep(ARTICLE_POLL).await;
        }
    })
    .await
    .is_ok()
}

/// A launched browser plus the task pumping its CDP connection.
///
/// Dropping the session aborts the handler task and drops the browser, which
/// kills the child process. Call [`BrowserSession::close`] for an orderly shutdown.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            ScrapeError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
            return;
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_renderer_fails() {
        let url = Url::parse("https://ex.com").unwrap();
        let err = tokio_test::assert_err!(tokio_test::block_on(DisabledRenderer.render(&url)));
        assert!(matches!(err, ScrapeError::Browser(_)));
    }

    #[test]
    fn test_render_options_follow_config() {
        let config = ScraperConfig {
            browser_headless: false,
            browser_wait_secs: 4,
            chrome_executable: Some("/usr/bin/chromium".into()),
            ..Default::default()
        };
        let options = RenderOptions::from(&config);
        assert!(!options.headless);
        assert_eq!(options.article_wait, Duration::from_secs(4));
        assert_eq!(options.fallback_wait, Duration::from_secs(3));
        assert_eq!(options.chrome_executable.as_deref(), Some("/usr/bin/chromium"));
    }
}
