use crate::normalize::collapse_whitespace;
use crate::rules::{AttrRule, Rule};
use crate::types::{push_unique, Metadata};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

pub const DEFAULT_MAX_IMAGES: usize = 10;

static AUTHOR_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)author|byline").unwrap());
static DATE_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)date|published").unwrap());

static TITLE_RULES: [Rule; 4] = [
    Rule::new("meta", AttrRule::Equals("property", "og:title")),
    Rule::new("meta", AttrRule::Equals("name", "twitter:title")),
    Rule::tag("h1"),
    Rule::tag("title"),
];

static AUTHOR_RULES: [Rule; 7] = [
    Rule::new("meta", AttrRule::Equals("name", "author")),
    Rule::new("meta", AttrRule::Equals("property", "article:author")),
    Rule::new("meta", AttrRule::Equals("name", "article:author")),
    Rule::new("span", AttrRule::Pattern("class", &AUTHOR_CLASS)),
    Rule::new("div", AttrRule::Pattern("class", &AUTHOR_CLASS)),
    Rule::new("a", AttrRule::Token("rel", "author")),
    Rule::new("p", AttrRule::Pattern("class", &AUTHOR_CLASS)),
];

static DATE_RULES: [Rule; 6] = [
    Rule::new("meta", AttrRule::Equals("property", "article:published_time")),
    Rule::new("meta", AttrRule::Equals("name", "publish_date")),
    Rule::new("meta", AttrRule::Equals("name", "date")),
    Rule::new("time", AttrRule::Present("datetime")),
    Rule::new("span", AttrRule::Pattern("class", &DATE_CLASS)),
    Rule::new("div", AttrRule::Pattern("class", &DATE_CLASS)),
];

static DESCRIPTION_RULES: [Rule; 2] = [
    Rule::new("meta", AttrRule::Equals("name", "description")),
    Rule::new("meta", AttrRule::Equals("property", "og:description")),
];

static KEYWORDS: Rule = Rule::new("meta", AttrRule::Equals("name", "keywords"));
static OG_IMAGE: Rule = Rule::new("meta", AttrRule::Equals("property", "og:image"));
static IMG: Rule = Rule::new("img", AttrRule::Present("src"));
static CANONICAL: Rule = Rule::new("link", AttrRule::Token("rel", "canonical"));
static SITE_NAME: Rule = Rule::new("meta", AttrRule::Equals("property", "og:site_name"));
static HTML: Rule = Rule::tag("html");

/// Derive page metadata from a parsed document. Never fails; unknown fields stay empty.
pub fn extract(document: &Html, page_url: &Url) -> Metadata {
    extract_with_limit(document, page_url, DEFAULT_MAX_IMAGES)
}

pub fn extract_with_limit(document: &Html, page_url: &Url, max_images: usize) -> Metadata {
    let metadata = Metadata {
        title: first_match(document, &TITLE_RULES, element_value),
        authors: extract_authors(document),
        publish_date: first_match(document, &DATE_RULES, date_value),
        description: first_match(document, &DESCRIPTION_RULES, |el| content_attr(el)),
        keywords: extract_keywords(document),
        images: extract_images(document, page_url, max_images),
        canonical_url: extract_canonical(document, page_url),
        site_name: SITE_NAME.select_first(document).and_then(|el| content_attr(&el)),
        language: HTML
            .select_first(document)
            .and_then(|el| el.value().attr("lang"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    };
    debug!(
        "metadata for {}: title={:?} authors={} images={}",
        page_url,
        metadata.title,
        metadata.authors.len(),
        metadata.images.len()
    );
    metadata
}

/// First non-empty value over the rules, in rule priority then document order.
fn first_match<F>(document: &Html, rules: &[Rule], value: F) -> Option<String>
where
    F: Fn(&ElementRef) -> Option<String>,
{
    rules
        .iter()
        .flat_map(|rule| rule.select_all(document))
        .find_map(|el| value(&el))
}

fn content_attr(el: &ElementRef) -> Option<String> {
    el.value()
        .attr("content")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn element_text(el: &ElementRef) -> Option<String> {
    let text = collapse_whitespace(&el.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn element_value(el: &ElementRef) -> Option<String> {
    content_attr(el).or_else(|| element_text(el))
}

fn date_value(el: &ElementRef) -> Option<String> {
    content_attr(el)
        .or_else(|| {
            el.value()
                .attr("datetime")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .or_else(|| element_text(el))
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for rule in AUTHOR_RULES.iter() {
        for el in rule.select_all(document) {
            if let Some(author) = element_value(&el) {
                push_unique(&mut authors, &author);
            }
        }
    }
    authors
}

fn extract_keywords(document: &Html) -> Vec<String> {
    let mut keywords = Vec::new();
    if let Some(content) = KEYWORDS.select_first(document).and_then(|el| content_attr(&el)) {
        for keyword in content.split(',') {
            push_unique(&mut keywords, keyword);
        }
    }
    keywords
}

/// `og:image` first, then every `<img src>` in document order, all absolute and unique.
fn extract_images(document: &Html, page_url: &Url, max_images: usize) -> Vec<String> {
    let og = OG_IMAGE
        .select_first(document)
        .and_then(|el| content_attr(&el));
    let srcs = IMG
        .select_all(document)
        .filter_map(|el| el.value().attr("src").map(str::to_string));

    let mut images = Vec::new();
    for src in og.into_iter().chain(srcs) {
        if images.len() >= max_images {
            break;
        }
        if let Some(absolute) = resolve(page_url, &src) {
            push_unique(&mut images, &absolute);
        }
    }
    images
}

fn extract_canonical(document: &Html, page_url: &Url) -> String {
    CANONICAL
        .select_first(document)
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(page_url, href))
        .unwrap_or_else(|| page_url.to_string())
}

/// Resolve `href` against the page URL; `None` when it cannot form an absolute URL.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}
