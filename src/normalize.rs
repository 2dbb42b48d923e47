use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Cookie, newsletter and account prompts that leak into extracted text.
/// Matched as whole words only: "Registered" or "loginName" are left alone.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:accept all cookies|subscribe to (?:our )?newsletter|sign up|log ?in|register)\b",
    )
    .unwrap()
});

/// Collapse whitespace, drop boilerplate prompts and trim.
///
/// Prompts are removed only where they stand as whole words; a phrase embedded
/// inside a longer word is kept.
///
/// Runs to a fixpoint so that a removal which glues two fragments into a new
/// phrase (or a double space) is cleaned as well; `normalize(normalize(x))`
/// is always `normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut current = WHITESPACE.replace_all(text, " ").into_owned();
    loop {
        let stripped = BOILERPLATE.replace_all(&current, "");
        if stripped.len() == current.len() {
            break;
        }
        current = WHITESPACE.replace_all(&stripped, " ").into_owned();
    }
    current.trim().to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
