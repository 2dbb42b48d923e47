use super::{Strategy, StrategySettings};
use crate::content::{self, RegionProfile, MIN_REGION_CHARS, NOISE_TAGS, STANDARD_PROFILE};
use crate::error::Result;
use crate::fetch::{fetch_with_retry, Fetcher};
use crate::metadata;
use crate::normalize::normalize;
use crate::tables::{extract_tables, render_tables};
use crate::types::{ExtractionResult, Method};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Selector-driven scan of the fetched HTML, retried on fetch failure.
pub struct HeuristicStrategy {
    fetcher: Arc<dyn Fetcher>,
    settings: StrategySettings,
    attempts: u32,
    retry_delay: (Duration, Duration),
}

impl HeuristicStrategy {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        settings: StrategySettings,
        attempts: u32,
        retry_delay: (Duration, Duration),
    ) -> Self {
        Self {
            fetcher,
            settings,
            attempts,
            retry_delay,
        }
    }
}

#[async_trait]
impl Strategy for HeuristicStrategy {
    fn method(&self) -> Method {
        Method::Heuristic
    }

    async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
        let page = fetch_with_retry(
            self.fetcher.as_ref(),
            url,
            self.settings.fetch_timeout,
            self.attempts,
            self.retry_delay,
        )
        .await?;
        let base = page.base_url(url);
        Ok(scan(
            Method::Heuristic,
            &page.html,
            &base,
            url,
            ScanProfile {
                regions: &STANDARD_PROFILE,
                noise_tags: NOISE_TAGS,
            },
            &self.settings,
        ))
    }
}

/// What a scan strips and where it looks for the body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanProfile {
    pub regions: &'static RegionProfile,
    pub noise_tags: &'static [&'static str],
}

/// Strip noise, then read metadata, content regions and tables from one document.
///
/// Region text shorter than [`MIN_REGION_CHARS`] is replaced by all visible text
/// of the stripped document. Rendered tables are appended to the body.
pub(crate) fn scan(
    method: Method,
    html: &str,
    page_url: &Url,
    source: &Url,
    profile: ScanProfile,
    settings: &StrategySettings,
) -> ExtractionResult {
    let mut document = Html::parse_document(html);
    content::strip_tags(&mut document, profile.noise_tags);

    let meta = metadata::extract_with_limit(&document, page_url, settings.max_images);
    let tables = extract_tables(&document);

    let mut body = content::select_fragments(&document, profile.regions).join(" ");
    if body.chars().count() < MIN_REGION_CHARS {
        debug!("{}: region text too short ({} chars), using whole document", method, body.chars().count());
        body = content::visible_text(&document);
    }

    let mut text = normalize(&body);
    text.push_str(&render_tables(&tables));

    let description = meta.description.clone();
    let mut result = ExtractionResult::new(method, source.as_str(), text)
        .with_summary_limit(settings.summary_chars)
        .with_metadata(meta);
    result.description = description;
    result.tables = tables;
    result
}
