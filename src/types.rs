use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Extraction technique that produced a result, in pipeline priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Article,
    Robust,
    Readability,
    Heuristic,
    Rendered,
    Raw,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Article,
        Method::Robust,
        Method::Readability,
        Method::Heuristic,
        Method::Rendered,
        Method::Raw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Article => "article",
            Method::Robust => "robust",
            Method::Readability => "readability",
            Method::Heuristic => "heuristic",
            Method::Rendered => "rendered",
            Method::Raw => "raw",
        }
    }

    /// Text must be strictly longer than this many characters to be accepted.
    /// `None` means the strategy accepts any non-empty text.
    pub fn min_text_len(&self) -> Option<usize> {
        match self {
            Method::Article | Method::Robust | Method::Readability => Some(100),
            Method::Heuristic | Method::Rendered => Some(50),
            Method::Raw => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Method::Article => "News article extraction",
            Method::Robust => "Robust content extraction",
            Method::Readability => "Main content extraction",
            Method::Heuristic => "Advanced HTML parsing",
            Method::Rendered => "JavaScript-rendered content",
            Method::Raw => "Fallback full text extraction",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table as ordered rows of cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Page metadata gathered from meta tags and markup. Absent values stay absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub images: Vec<String>,
    pub canonical_url: String,
    pub site_name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub method: Method,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub text: String,
    pub top_image: Option<String>,
    pub images: Vec<String>,
    pub keywords: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    pub success: bool,
    #[serde(default)]
    pub scrape_time: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ExtractionResult {
    pub fn new(method: Method, source: &str, text: String) -> Self {
        Self {
            method,
            title: None,
            authors: Vec::new(),
            publish_date: None,
            summary: summarize(&text, DEFAULT_SUMMARY_CHARS),
            text,
            top_image: None,
            images: Vec::new(),
            keywords: Vec::new(),
            tables: Vec::new(),
            description: None,
            source: source.to_string(),
            success: false,
            scrape_time: None,
            timestamp: None,
        }
    }

    /// Copy the shared metadata fields over; `top_image` becomes the first image.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.title = metadata.title;
        self.authors = metadata.authors;
        self.publish_date = metadata.publish_date;
        self.top_image = metadata.images.first().cloned();
        self.images = metadata.images;
        self.keywords = metadata.keywords;
        self
    }

    /// Re-derive the truncated summary with a different length.
    pub fn with_summary_limit(mut self, limit: usize) -> Self {
        self.summary = summarize(&self.text, limit);
        self
    }

    /// Enforce the no-duplicates rule on list fields filled by third-party parsers.
    pub fn dedup_lists(&mut self) {
        dedup_in_place(&mut self.authors);
        dedup_in_place(&mut self.images);
        dedup_in_place(&mut self.keywords);
    }

    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

pub const DEFAULT_SUMMARY_CHARS: usize = 500;

/// First `limit` characters of `text` followed by `...` when longer, else the text itself.
pub fn summarize(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Append `value` unless it is empty or already present.
pub fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn dedup_in_place(list: &mut Vec<String>) {
    let mut seen = HashSet::new();
    list.retain(|v| !v.is_empty() && seen.insert(v.clone()));
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_truncates_on_char_boundary() {
        let text = "é".repeat(600);
        let summary = summarize(&text, 500);
        assert_eq!(summary.chars().count(), 503);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize("short", 500), "short");
    }

    #[test]
    fn test_push_unique_skips_duplicates_and_blanks() {
        let mut authors = Vec::new();
        push_unique(&mut authors, "Jane Doe");
        push_unique(&mut authors, " Jane Doe ");
        push_unique(&mut authors, "");
        push_unique(&mut authors, "John Roe");
        assert_eq!(authors, vec!["Jane Doe", "John Roe"]);
    }

    #[test]
    fn test_dedup_lists_preserves_order() {
        let mut result = ExtractionResult::new(Method::Article, "https://ex.com", "body".into());
        result.keywords = vec!["b".into(), "a".into(), "b".into(), "".into(), "c".into()];
        result.dedup_lists();
        assert_eq!(result.keywords, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_method_serializes_lowercase() {
        let json = serde_json::to_string(&Method::Heuristic).unwrap();
        assert_eq!(json, "\"heuristic\"");
        assert_eq!(Method::Raw.min_text_len(), None);
        assert_eq!(Method::Rendered.min_text_len(), Some(50));
    }

    #[test]
    fn test_table_serializes_as_nested_arrays() {
        let table = Table { rows: vec![vec!["a".into(), "b".into()]] };
        assert_eq!(serde_json::to_string(&table).unwrap(), r#"[["a","b"]]"#);
    }
}
