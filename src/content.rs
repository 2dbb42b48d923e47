use crate::normalize::collapse_whitespace;
use crate::rules::{AttrRule, Rule};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Fragments at or below this many characters are navigation labels or button text.
pub const MIN_FRAGMENT_CHARS: usize = 20;

/// Below this many characters the region text is replaced by whole-document text.
pub const MIN_REGION_CHARS: usize = 200;

pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript",
];

pub const RENDERED_NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "iframe"];

pub const SCRIPT_TAGS: &[&str] = &["script", "style"];

static CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)article|content|post|entry|main|story").unwrap());
static SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)article|content").unwrap());

/// Which containers count as content regions, and which descendants become fragments.
#[derive(Debug, Clone, Copy)]
pub struct RegionProfile {
    pub candidates: &'static [Rule],
    pub fragment_tags: &'static [&'static str],
}

static STANDARD_CANDIDATES: [Rule; 7] = [
    Rule::tag("article"),
    Rule::new("div", AttrRule::Pattern("class", &CONTAINER)),
    Rule::new("div", AttrRule::Pattern("id", &CONTAINER)),
    Rule::tag("main"),
    Rule::new("section", AttrRule::Pattern("class", &SECTION)),
    Rule::any_tag(AttrRule::Equals("role", "main")),
    Rule::any_tag(AttrRule::Equals("itemprop", "articleBody")),
];

static RENDERED_CANDIDATES: [Rule; 6] = [
    Rule::tag("article"),
    Rule::any_tag(AttrRule::Equals("role", "main")),
    Rule::new("div", AttrRule::Contains("class", "article")),
    Rule::new("div", AttrRule::Contains("class", "content")),
    Rule::new("div", AttrRule::Contains("class", "post")),
    Rule::tag("main"),
];

/// Static documents fetched over HTTP.
pub static STANDARD_PROFILE: RegionProfile = RegionProfile {
    candidates: &STANDARD_CANDIDATES,
    fragment_tags: &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li"],
};

/// Documents captured from a live browser.
pub static RENDERED_PROFILE: RegionProfile = RegionProfile {
    candidates: &RENDERED_CANDIDATES,
    fragment_tags: &["p", "h1", "h2", "h3", "h4", "h5", "li"],
};

/// Paragraph-level text from every matched content container.
///
/// Containers are visited in candidate priority, then document order; fragments
/// within a container come in document order. A fragment element reached through
/// several nested containers is kept once, at its first position.
pub fn select_fragments(document: &Html, profile: &RegionProfile) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fragments = Vec::new();

    for rule in profile.candidates {
        for container in rule.select_all(document) {
            for el in container.descendants().filter_map(ElementRef::wrap) {
                let name = el.value().name();
                if !profile.fragment_tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                    continue;
                }
                if !seen.insert(el.id()) {
                    continue;
                }
                let text = collapse_whitespace(&el.text().collect::<String>());
                if text.chars().count() > MIN_FRAGMENT_CHARS {
                    fragments.push(text);
                }
            }
        }
    }
    fragments
}

/// Remove every element with one of the given tag names, subtree included.
pub fn strip_tags(document: &mut Html, tags: &[&str]) {
    let doomed: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| tags.iter().any(|t| t.eq_ignore_ascii_case(el.value().name())))
        .map(|el| el.id())
        .collect();
    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Every text node of the document, trimmed and joined with single spaces.
pub fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_text())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "This paragraph is clearly long enough to be kept as content.";

    #[test]
    fn test_short_fragments_filtered() {
        let html = format!(
            "<html><body><article><p>Share</p><p>{LONG}</p><li>exactly twenty chars</li></article></body></html>"
        );
        let doc = Html::parse_document(&html);
        assert_eq!(select_fragments(&doc, &STANDARD_PROFILE), vec![LONG]);
    }

    #[test]
    fn test_nested_containers_do_not_duplicate() {
        let html = format!(
            r#"<html><body><div class="post-content"><article><p>{LONG}</p></article></div></body></html>"#
        );
        let doc = Html::parse_document(&html);
        assert_eq!(select_fragments(&doc, &STANDARD_PROFILE).len(), 1);
    }

    #[test]
    fn test_priority_then_document_order_is_stable() {
        let html = r#"<html><body>
            <div id="main-story"><p>Second container paragraph number one.</p></div>
            <article><h2>The article heading is long enough</h2><p>Article body paragraph text here.</p></article>
            <section class="content"><p>Section paragraph that is long enough.</p></section>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let first = select_fragments(&doc, &STANDARD_PROFILE);
        assert_eq!(
            first,
            vec![
                "The article heading is long enough",
                "Article body paragraph text here.",
                "Second container paragraph number one.",
                "Section paragraph that is long enough.",
            ]
        );
        for _ in 0..5 {
            assert_eq!(select_fragments(&doc, &STANDARD_PROFILE), first);
        }
    }

    #[test]
    fn test_role_and_itemprop_containers() {
        let html = format!(
            r#"<html><body><span role="main"><p>{LONG}</p></span><span itemprop="articleBody"><li>{LONG} again</li></span></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let fragments = select_fragments(&doc, &STANDARD_PROFILE);
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn test_rendered_profile_skips_h6() {
        let html = "<html><body><article><h6>A sixth level heading that is long</h6></article></body></html>";
        let doc = Html::parse_document(html);
        assert!(select_fragments(&doc, &RENDERED_PROFILE).is_empty());
        assert_eq!(select_fragments(&doc, &STANDARD_PROFILE).len(), 1);
    }

    #[test]
    fn test_strip_tags_and_visible_text() {
        let mut doc = Html::parse_document(
            "<html><head><style>p{}</style></head><body><nav>Menu</nav><p>Hello <b>world</b></p><script>var x;</script><footer>Foot</footer></body></html>",
        );
        strip_tags(&mut doc, NOISE_TAGS);
        assert_eq!(visible_text(&doc), "Hello world");
    }
}
