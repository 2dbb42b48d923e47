use super::{guard_parse, Strategy, StrategySettings};
use crate::enrich::enrich;
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetcher;
use crate::metadata::{self, resolve};
use crate::normalize::normalize;
use crate::tables::extract_tables;
use crate::types::{push_unique, ExtractionResult, Method};
use async_trait::async_trait;
use dom_smoothie::{Article, Config, Readability};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::debug;
use url::Url;

static BYLINE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*(?:written\s+)?by\s+").unwrap());
static BYLINE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s*(?:,|&|\band\b)\s*").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

/// Readability.js-style article parse, enriched with keywords and a summary.
pub struct ArticleStrategy {
    fetcher: Arc<dyn Fetcher>,
    settings: StrategySettings,
}

impl ArticleStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: StrategySettings) -> Self {
        Self { fetcher, settings }
    }

    fn build(&self, html: &str, page_url: &Url, source: &Url) -> Result<ExtractionResult> {
        let article = guard_parse("article parser", || parse_article(html, page_url))?;
        let text = normalize(&article.text_content);

        let original = Html::parse_document(html);
        let page_meta = metadata::extract_with_limit(&original, page_url, self.settings.max_images);

        let mut result = ExtractionResult::new(Method::Article, source.as_str(), text)
            .with_summary_limit(self.settings.summary_chars);

        result.title = Some(article.title.trim().to_string())
            .filter(|t| !t.is_empty())
            .or(page_meta.title);
        result.authors = article
            .byline
            .as_deref()
            .map(split_byline)
            .filter(|authors| !authors.is_empty())
            .unwrap_or(page_meta.authors);
        result.publish_date = article.published_time.clone().or(page_meta.publish_date);
        result.images = article_images(&article, page_url, self.settings.max_images);
        result.top_image = result.images.first().cloned();
        result.description = article.excerpt.clone().or(page_meta.description);
        result.keywords = page_meta.keywords;
        result.tables = extract_tables(&original);

        match enrich(&result.text) {
            Ok(enrichment) => {
                for keyword in &enrichment.keywords {
                    push_unique(&mut result.keywords, keyword);
                }
                if !enrichment.summary.is_empty() {
                    result.summary = enrichment.summary;
                }
            }
            Err(e) => debug!("Enrichment skipped: {}", e),
        }
        Ok(result)
    }
}

#[async_trait]
impl Strategy for ArticleStrategy {
    fn method(&self) -> Method {
        Method::Article
    }

    async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
        let page = self
            .fetcher
            .fetch(url, self.settings.fetch_timeout)
            .await?
            .ensure_success()?;
        self.build(&page.html, &page.base_url(url), url)
    }
}

fn parse_article(html: &str, page_url: &Url) -> Result<Article> {
    let cfg = Config {
        max_elements_to_parse: 9000,
        ..Default::default()
    };
    let mut readability = Readability::new(html, Some(page_url.as_str()), Some(cfg))
        .map_err(|e| ScrapeError::Parse(format!("article parser: {}", e)))?;
    readability
        .parse()
        .map_err(|e| ScrapeError::Parse(format!("article parser: {}", e)))
}

/// `"By Jane Doe and John Roe"` → `["Jane Doe", "John Roe"]`.
fn split_byline(byline: &str) -> Vec<String> {
    let stripped = BYLINE_PREFIX.replace(byline.trim(), "");
    let mut authors = Vec::new();
    for name in BYLINE_SEPARATOR.split(&stripped) {
        push_unique(&mut authors, name);
    }
    authors
}

/// Lead image first, then every image inside the extracted content.
fn article_images(article: &Article, page_url: &Url, cap: usize) -> Vec<String> {
    let mut images = Vec::new();
    if let Some(lead) = article.image.as_deref().and_then(|src| resolve(page_url, src)) {
        images.push(lead);
    }
    let content = Html::parse_fragment(&article.content);
    for img in content.select(&IMG) {
        if images.len() >= cap {
            break;
        }
        if let Some(src) = img.value().attr("src").and_then(|src| resolve(page_url, src)) {
            push_unique(&mut images, &src);
        }
    }
    images
}
