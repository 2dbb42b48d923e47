//! Declarative (tag, attribute) matching used by the metadata and content tables.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy)]
pub enum AttrRule {
    /// Any element with the tag.
    Any,
    /// Attribute equals the value exactly.
    Equals(&'static str, &'static str),
    /// Attribute is present, whatever its value.
    Present(&'static str),
    /// Whitespace-separated attribute (like `rel`) contains the token.
    Token(&'static str, &'static str),
    /// Attribute value contains the substring (CSS `*=`).
    Contains(&'static str, &'static str),
    /// Regex search over the attribute; for `class`, each class is tested on its own.
    Pattern(&'static str, &'static LazyLock<Regex>),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub tag: Option<&'static str>,
    pub attr: AttrRule,
}

impl Rule {
    pub const fn tag(tag: &'static str) -> Self {
        Self { tag: Some(tag), attr: AttrRule::Any }
    }

    pub const fn new(tag: &'static str, attr: AttrRule) -> Self {
        Self { tag: Some(tag), attr }
    }

    pub const fn any_tag(attr: AttrRule) -> Self {
        Self { tag: None, attr }
    }

    pub fn matches(&self, element: &ElementRef) -> bool {
        let el = element.value();
        if let Some(tag) = self.tag {
            if !el.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        match self.attr {
            AttrRule::Any => true,
            AttrRule::Equals(name, value) => el.attr(name) == Some(value),
            AttrRule::Present(name) => el.attr(name).is_some(),
            AttrRule::Token(name, token) => el
                .attr(name)
                .map(|v| v.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
                .unwrap_or(false),
            AttrRule::Contains(name, needle) => {
                el.attr(name).map(|v| v.contains(needle)).unwrap_or(false)
            }
            AttrRule::Pattern("class", re) => el.classes().any(|c| re.is_match(c)),
            AttrRule::Pattern(name, re) => el.attr(name).map(|v| re.is_match(v)).unwrap_or(false),
        }
    }

    /// All matching elements in document order.
    pub fn select_all<'a>(&self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let rule = *self;
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(move |el| rule.matches(el))
    }

    pub fn select_first<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.select_all(document).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BYLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)author|byline").unwrap());

    #[test]
    fn test_class_pattern_matches_single_class() {
        let doc = Html::parse_document(
            r#"<div class="post-Byline wide">A</div><div class="other">B</div><span class="author">C</span>"#,
        );
        let rule = Rule::new("div", AttrRule::Pattern("class", &BYLINE));
        let texts: Vec<String> = rule.select_all(&doc).map(|e| e.text().collect()).collect();
        assert_eq!(texts, vec!["A"]);
    }

    #[test]
    fn test_token_and_presence_rules() {
        let doc = Html::parse_document(
            r#"<a rel="nofollow author" href="/a">Ann</a><a rel="next">N</a><time datetime="2024-01-01">x</time>"#,
        );
        let author = Rule::new("a", AttrRule::Token("rel", "author"));
        assert_eq!(author.select_all(&doc).count(), 1);
        let time = Rule::new("time", AttrRule::Present("datetime"));
        assert!(time.select_first(&doc).is_some());
    }

    #[test]
    fn test_any_tag_rule() {
        let doc = Html::parse_document(r#"<section role="main">x</section><div role="main">y</div>"#);
        let rule = Rule::any_tag(AttrRule::Equals("role", "main"));
        assert_eq!(rule.select_all(&doc).count(), 2);
    }
}
