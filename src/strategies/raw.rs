use super::{Strategy, StrategySettings};
use crate::content::{self, SCRIPT_TAGS};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::metadata;
use crate::normalize::normalize;
use crate::tables::extract_tables;
use crate::types::{ExtractionResult, Method};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use url::Url;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Last resort: every visible string on the page, accepted whenever the fetch works.
pub struct RawStrategy {
    fetcher: Arc<dyn Fetcher>,
    settings: StrategySettings,
}

impl RawStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: StrategySettings) -> Self {
        Self { fetcher, settings }
    }

    fn build(&self, html: &str, page_url: &Url, source: &Url) -> ExtractionResult {
        let mut document = Html::parse_document(html);
        content::strip_tags(&mut document, SCRIPT_TAGS);

        let meta = metadata::extract_with_limit(&document, page_url, self.settings.max_images);
        let tables = extract_tables(&document);
        let text = normalize(&content::visible_text(&document));

        let description = meta.description.clone();
        let mut result = ExtractionResult::new(Method::Raw, source.as_str(), text)
            .with_summary_limit(self.settings.summary_chars)
            .with_metadata(meta);
        if result.title.is_none() {
            result.title = Some(UNKNOWN_TITLE.to_string());
        }
        if result.authors.is_empty() {
            result.authors.push(UNKNOWN_AUTHOR.to_string());
        }
        result.description = description;
        result.tables = tables;
        result
    }
}

#[async_trait]
impl Strategy for RawStrategy {
    fn method(&self) -> Method {
        Method::Raw
    }

    async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
        let page = self.fetcher.fetch(url, self.settings.fetch_timeout).await?;
        Ok(self.build(&page.html, &page.base_url(url), url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::strategies::Attempt;
    use std::time::Duration;

    fn strategy(fetcher: StaticFetcher) -> RawStrategy {
        RawStrategy::new(
            Arc::new(fetcher),
            StrategySettings {
                fetch_timeout: Duration::from_secs(1),
                summary_chars: 500,
                max_images: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_placeholders_when_metadata_is_missing() {
        let url = Url::parse("https://ex.com/bare").unwrap();
        let html = "<html><body><div>ok</div><script>alert('x')</script><style>p{}</style></body></html>";
        let fetcher = StaticFetcher::default().with_page(url.as_str(), html);
        match strategy(fetcher).attempt(&url).await {
            Attempt::Accepted(result) => {
                assert_eq!(result.method, Method::Raw);
                assert!(result.success);
                assert_eq!(result.text, "ok");
                assert_eq!(result.title.as_deref(), Some(UNKNOWN_TITLE));
                assert_eq!(result.authors, vec![UNKNOWN_AUTHOR]);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keeps_real_metadata_and_nav_text() {
        let url = Url::parse("https://ex.com/page").unwrap();
        let html = r#"<html><head><title>Real</title><meta name="author" content="Ana"></head>
            <body><nav>Menu</nav><p>Body</p></body></html>"#;
        let fetcher = StaticFetcher::default().with_page(url.as_str(), html);
        match strategy(fetcher).attempt(&url).await {
            Attempt::Accepted(result) => {
                assert_eq!(result.title.as_deref(), Some("Real"));
                assert_eq!(result.authors, vec!["Ana"]);
                assert!(result.text.contains("Menu"));
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_page_is_still_extracted() {
        let url = Url::parse("https://ex.com/guarded").unwrap();
        let html = "<html><head><title>Access check</title></head><body><p>Please verify you are human.</p></body></html>";
        let fetcher = StaticFetcher::default().with_status_page(url.as_str(), 403, html);
        match strategy(fetcher).attempt(&url).await {
            Attempt::Accepted(result) => {
                assert_eq!(result.title.as_deref(), Some("Access check"));
                assert!(result.text.contains("Please verify you are human."));
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }
}
