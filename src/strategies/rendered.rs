use super::heuristic::{scan, ScanProfile};
use super::{Strategy, StrategySettings};
use crate::browser::Renderer;
use crate::content::{RENDERED_NOISE_TAGS, RENDERED_PROFILE};
use crate::error::Result;
use crate::types::{ExtractionResult, Method};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Same scan as the heuristic strategy, run against the DOM of a live browser.
pub struct RenderedStrategy {
    renderer: Arc<dyn Renderer>,
    settings: StrategySettings,
}

impl RenderedStrategy {
    pub fn new(renderer: Arc<dyn Renderer>, settings: StrategySettings) -> Self {
        Self { renderer, settings }
    }
}

#[async_trait]
impl Strategy for RenderedStrategy {
    fn method(&self) -> Method {
        Method::Rendered
    }

    async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
        let html = self.renderer.render(url).await?;
        Ok(scan(
            Method::Rendered,
            &html,
            url,
            url,
            ScanProfile {
                regions: &RENDERED_PROFILE,
                noise_tags: RENDERED_NOISE_TAGS,
            },
            &self.settings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::DisabledRenderer;
    use crate::error::ScrapeError;
    use crate::strategies::{Attempt, Rejection};
    use std::time::Duration;

    struct FixedRenderer(String);

    #[async_trait]
    impl Renderer for FixedRenderer {
        async fn render(&self, _url: &Url) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn settings() -> StrategySettings {
        StrategySettings {
            fetch_timeout: Duration::from_secs(1),
            summary_chars: 500,
            max_images: 10,
        }
    }

    #[tokio::test]
    async fn test_rendered_dom_uses_rendered_regions() {
        let body = "Client-side rendered paragraph with plenty of words in it. ".repeat(5);
        let html = format!(
            "<html><head><title>Rendered</title></head><body><div class=\"post-body\"><h5>A fifth level heading here</h5><p>{body}</p></div></body></html>"
        );
        let strategy = RenderedStrategy::new(Arc::new(FixedRenderer(html)), settings());
        let url = Url::parse("https://spa.example/post").unwrap();
        match strategy.attempt(&url).await {
            Attempt::Accepted(result) => {
                assert_eq!(result.method, Method::Rendered);
                assert_eq!(result.title.as_deref(), Some("Rendered"));
                assert!(result.text.starts_with("A fifth level heading here"));
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disabled_browser_is_rejected() {
        let strategy = RenderedStrategy::new(Arc::new(DisabledRenderer), settings());
        let url = Url::parse("https://spa.example/post").unwrap();
        assert!(matches!(
            strategy.attempt(&url).await,
            Attempt::Rejected(Rejection::Failed(ScrapeError::Browser(_)))
        ));
    }
}
