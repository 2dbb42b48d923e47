//! Lightweight keyword and summary derivation for article text.

use crate::error::{Result, ScrapeError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const MAX_KEYWORDS: usize = 10;
const SUMMARY_SENTENCES: usize = 5;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'-]*").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "more", "most", "my",
    "new", "no", "not", "of", "on", "one", "or", "our", "out", "over", "said", "she", "so",
    "some", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "to", "up", "was", "we", "were", "what", "when", "which", "who", "will", "with",
    "would", "you", "your",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub keywords: Vec<String>,
    pub summary: String,
}

/// Top keywords by frequency and a summary made of the best-scoring sentences
/// kept in their original order.
pub fn enrich(text: &str) -> Result<Enrichment> {
    let frequencies = word_frequencies(text);
    if frequencies.is_empty() {
        return Err(ScrapeError::Parse("no words to rank".into()));
    }

    let mut ranked: Vec<(&String, &usize)> = frequencies.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let keywords: Vec<String> = ranked
        .iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| (*word).clone())
        .collect();

    let sentences = split_sentences(text);
    let mut scored: Vec<(usize, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let score = WORD
                .find_iter(sentence)
                .map(|m| m.as_str().to_lowercase())
                .filter(|w| keywords.contains(w))
                .count();
            (i, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut picked: Vec<usize> = scored.iter().take(SUMMARY_SENTENCES).map(|(i, _)| *i).collect();
    picked.sort_unstable();

    let summary = picked
        .iter()
        .map(|&i| sentences[i])
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Enrichment { keywords, summary })
}

fn word_frequencies(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for m in WORD.find_iter(text) {
        let word = m.as_str().to_lowercase();
        if word.chars().count() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if word.chars().all(|c| c.is_numeric()) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
