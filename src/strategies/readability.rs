use super::{guard_parse, Strategy, StrategySettings};
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetcher;
use crate::metadata;
use crate::normalize::normalize;
use crate::tables::extract_tables;
use crate::types::{ExtractionResult, Method};
use async_trait::async_trait;
use readability::extractor;
use scraper::Html;
use std::sync::Arc;
use url::Url;

/// Readability main-content transform, with metadata read from the untouched page.
pub struct ReadabilityStrategy {
    fetcher: Arc<dyn Fetcher>,
    settings: StrategySettings,
}

impl ReadabilityStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: StrategySettings) -> Self {
        Self { fetcher, settings }
    }

    fn build(&self, html: &str, page_url: &Url, source: &Url) -> Result<ExtractionResult> {
        let product = guard_parse("readability", || {
            extractor::extract(&mut html.as_bytes(), page_url)
                .map_err(|e| ScrapeError::Parse(format!("readability: {}", e)))
        })?;
        let text = normalize(&html2text::from_read(product.content.as_bytes(), 80));

        let original = Html::parse_document(html);
        let meta = metadata::extract_with_limit(&original, page_url, self.settings.max_images);
        let tables = extract_tables(&original);

        let description = meta.description.clone();
        let mut result = ExtractionResult::new(Method::Readability, source.as_str(), text)
            .with_summary_limit(self.settings.summary_chars)
            .with_metadata(meta);
        if result.title.is_none() && !product.title.trim().is_empty() {
            result.title = Some(product.title.trim().to_string());
        }
        result.description = description;
        result.tables = tables;
        Ok(result)
    }
}

#[async_trait]
impl Strategy for ReadabilityStrategy {
    fn method(&self) -> Method {
        Method::Readability
    }

    async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
        let page = self.fetcher.fetch(url, self.settings.fetch_timeout).await?;
        self.build(&page.html, &page.base_url(url), url)
    }
}
