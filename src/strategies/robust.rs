use super::{guard_parse, Strategy, StrategySettings};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::metadata::resolve;
use crate::normalize::{collapse_whitespace, count_words, normalize};
use crate::tables::extract_tables;
use crate::types::{push_unique, ExtractionResult, Method};
use async_trait::async_trait;
use readability::extractor;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use select::document::Document as SelectDoc;
use select::predicate::{Attr as SelAttr, Name as SelName, Predicate};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style|noscript|svg|canvas|iframe)[^>]*?>.*?</(?:script|style|noscript|svg|canvas|iframe)>")
        .unwrap()
});

static AD_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:div|section|aside|article)[^>]*?(?:id|class)=(?:'|")[^'">]*(?:ads|advert|sponsor|promo|related|cookie|banner|modal|subscribe|newsletter|share|social|sidebar|comments|breadcrumb|pagination)[^'">]*(?:'|")[^>]*?>.*?</(?:div|section|aside|article)>"#,
    )
    .unwrap()
});

static GARBAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)subscribe|sign up|cookie|accept all|advert|sponsor|newsletter|\bshare\b|related articles|^comments?$|read more|continue reading|terms of service|privacy policy",
    )
    .unwrap()
});

/// Lines at least this long are prose even when they mention a garbage phrase.
const GARBAGE_LINE_MAX_CHARS: usize = 120;

/// Containers tried in order when scoring candidate regions.
const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=main]",
    "[itemprop=articleBody]",
    ".entry-content",
    ".post-content",
    ".article-content",
    "#content",
    "#main",
    ".content",
    ".post",
    ".article",
];

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "canvas", "iframe", "form", "header", "footer", "nav", "aside",
];

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="author"], meta[property="article:author"]"#).unwrap()
});
static PUBLISHED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="article:published_time"]"#).unwrap());
static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static KEYWORDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="keywords"], meta[property="article:tag"]"#).unwrap()
});
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Pre-cleaned HTML run through several extractors; the wordiest output wins.
pub struct RobustStrategy {
    fetcher: Arc<dyn Fetcher>,
    settings: StrategySettings,
}

impl RobustStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: StrategySettings) -> Self {
        Self { fetcher, settings }
    }

    fn build(&self, html: &str, page_url: &Url, source: &Url) -> Result<ExtractionResult> {
        let document = Html::parse_document(html);
        let body = guard_parse("robust extractor", || Ok(extract_clean_content(html, page_url)))?;

        let mut result = ExtractionResult::new(Method::Robust, source.as_str(), normalize(&body))
            .with_summary_limit(self.settings.summary_chars);
        result.title = first_text(&document, &TITLE)
            .or_else(|| first_text(&document, &H1))
            .or_else(|| first_content(&document, &OG_TITLE));
        for el in document.select(&AUTHOR) {
            if let Some(author) = el.value().attr("content") {
                push_unique(&mut result.authors, author);
            }
        }
        result.publish_date = first_content(&document, &PUBLISHED);
        result.top_image = first_content(&document, &OG_IMAGE).and_then(|src| resolve(page_url, &src));
        for el in document.select(&KEYWORDS) {
            for keyword in el.value().attr("content").unwrap_or_default().split(',') {
                push_unique(&mut result.keywords, keyword);
            }
        }
        result.description = first_content(&document, &DESCRIPTION);
        result.tables = extract_tables(&document);
        Ok(result)
    }
}

#[async_trait]
impl Strategy for RobustStrategy {
    fn method(&self) -> Method {
        Method::Robust
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

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn first_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Clean body text: focused container first, then readability against the
/// container heuristic, then the whole document as a last resort.
fn extract_clean_content(html: &str, base_url: &Url) -> String {
    let pre = preprocess_html(html);

    if let Some(text) = extract_focused_container(&pre) {
        if text.len() > 120 {
            return text;
        }
    }

    let readability_text = match extractor::extract(&mut pre.as_bytes(), base_url) {
        Ok(product) => post_clean_text(&html2text::from_read(product.content.as_bytes(), 80)),
        Err(e) => {
            warn!("Readability extraction failed: {}, will try heuristics", e);
            String::new()
        }
    };
    let heuristic_text = heuristic_main_extraction(&pre);

    let rt_words = count_words(&readability_text);
    let ht_words = count_words(&heuristic_text);
    debug!("robust: readability {} words, heuristic {} words", rt_words, ht_words);

    let chosen = if rt_words == 0 && ht_words > 0 {
        heuristic_text
    } else if ht_words == 0 && rt_words > 0 {
        readability_text
    } else if ht_words > rt_words.saturating_add(20) {
        heuristic_text
    } else if rt_words > 0 {
        readability_text
    } else {
        fallback_text_extraction(&pre)
    };

    if chosen.len() < 80 {
        return post_clean_text(&html2text::from_read(pre.as_bytes(), 80));
    }
    chosen
}

/// Drop whole script-like blocks and ad/utility containers before parsing.
fn preprocess_html(html: &str) -> String {
    let s = BLOCK_TAGS.replace_all(html, " ");
    AD_BLOCKS.replace_all(&s, " ").into_owned()
}

/// `div#content`, `main` or `article` when one of them holds more than 50 words.
fn extract_focused_container(html: &str) -> Option<String> {
    let doc = SelectDoc::from(html);
    let candidates = [
        ("#content", doc.find(SelName("div").and(SelAttr("id", "content"))).next()),
        ("main", doc.find(SelName("main")).next()),
        ("article", doc.find(SelName("article")).next()),
    ];
    for (label, node) in candidates {
        let Some(node) = node else { continue };
        let text = post_clean_text(&html2text::from_read(node.inner_html().as_bytes(), 80));
        let words = count_words(&text);
        debug!("robust: {} container has {} words", label, words);
        if words > 50 {
            return Some(text);
        }
    }
    info!("robust: no focused container with enough text");
    None
}

/// Best-scoring candidate container by word count.
fn heuristic_main_extraction(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut best_text = String::new();
    let mut best_words = 0usize;

    for sel_str in CANDIDATE_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else { continue };
        for el in document.select(&sel) {
            let mut parts = Vec::new();
            collect_text(&el, &mut parts);
            let text = post_clean_text(&parts.join("\n"));
            let words = count_words(&text);
            if words > best_words {
                best_words = words;
                best_text = text;
            }
        }
    }
    best_text
}

fn fallback_text_extraction(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    match document.select(&BODY).next() {
        Some(body) => collect_text(&body, &mut parts),
        None => collect_text(&document.root_element(), &mut parts),
    }
    post_clean_text(&parts.join("\n"))
}

fn collect_text(element: &ElementRef, parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let el = child_el.value();
            if SKIPPED_TAGS.contains(&el.name()) {
                continue;
            }
            if el.id().is_some_and(is_noise_identifier) || el.classes().any(is_noise_identifier) {
                continue;
            }
            collect_text(&child_el, parts);
        } else if let Some(text) = child.value().as_text() {
            parts.push(text.to_string());
        }
    }
}

fn is_noise_identifier(ident: &str) -> bool {
    const NEEDLES: &[&str] = &[
        // plain "ad" would match "header"
        "ads", "advert", "adsense", "adunit", "ad-slot", "ad_container", "adbox", "sponsor", "promo",
        "cookie", "consent", "banner", "modal", "subscribe", "newsletter", "share", "social",
        "sidebar", "comments", "related", "breadcrumb", "pagination", "nav", "footer", "header",
        "hero", "toolbar",
    ];
    let ident = ident.to_ascii_lowercase();
    NEEDLES.iter().any(|n| ident.contains(n))
        || ident.contains("-ad")
        || ident.contains("ad-")
        || ident.contains("_ad")
        || ident.contains("ad_")
}

/// Line-level cleanup: short lines mentioning share/cookie/subscribe prompts go,
/// as do adjacent duplicates.
fn post_clean_text(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = collapse_whitespace(line);
        if line.chars().count() < 3 {
            continue;
        }
        if line.chars().count() < GARBAGE_LINE_MAX_CHARS && GARBAGE_LINE.is_match(&line) {
            continue;
        }
        if kept.last() != Some(&line) {
            kept.push(line);
        }
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::strategies::Attempt;
    use std::time::Duration;

    #[test]
    fn test_post_clean_drops_short_garbage_lines_only() {
        let long = "Readers who subscribe to the print edition receive the full archive, which spans every issue since the paper was founded in the harbour town.";
        let text = format!("Intro line\nShare\nSubscribe now\n{long}\n{long}\nok");
        let cleaned = post_clean_text(&text);
        assert_eq!(cleaned, format!("Intro line\n{long}"));
    }

    #[test]
    fn test_preprocess_removes_scripts_and_ad_blocks() {
        let html = r#"<p>keep</p><script>var x = 1;</script><div class="ad-banner">buy</div><p>also</p>"#;
        let pre = preprocess_html(html);
        assert!(pre.contains("keep") && pre.contains("also"));
        assert!(!pre.contains("var x") && !pre.contains("buy"));
    }

    #[test]
    fn test_noise_identifiers() {
        assert!(is_noise_identifier("site-header"));
        assert!(is_noise_identifier("top_ad"));
        assert!(!is_noise_identifier("article-body"));
        assert!(!is_noise_identifier("loaded"));
    }

    #[tokio::test]
    async fn test_article_container_and_metadata() {
        let url = Url::parse("https://ex.com/post").unwrap();
        let words = "Sentence with several plain words for counting purposes. ".repeat(12);
        let html = format!(
            r#"<html><head><title>Robust Title</title>
            <meta name="author" content="Lee"><meta property="article:published_time" content="2024-05-01">
            <meta property="og:image" content="/cover.jpg"><meta name="keywords" content="a, b, a"></head>
            <body><nav>menu</nav><article><p>{words}</p></article></body></html>"#
        );
        let fetcher = StaticFetcher::default().with_page(url.as_str(), &html);
        let strategy = RobustStrategy::new(
            Arc::new(fetcher),
            StrategySettings {
                fetch_timeout: Duration::from_secs(1),
                summary_chars: 500,
                max_images: 10,
            },
        );
        match strategy.attempt(&url).await {
            Attempt::Accepted(result) => {
                assert_eq!(result.method, Method::Robust);
                assert_eq!(result.title.as_deref(), Some("Robust Title"));
                assert_eq!(result.authors, vec!["Lee"]);
                assert_eq!(result.publish_date.as_deref(), Some("2024-05-01"));
                assert_eq!(result.top_image.as_deref(), Some("https://ex.com/cover.jpg"));
                assert_eq!(result.keywords, vec!["a", "b"]);
                assert!(result.images.is_empty());
                assert!(result.text.starts_with("Sentence with several plain words"));
                assert!(!result.text.contains("menu"));
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }
}
