//! Extraction strategies, tried in order by the pipeline.
//!
//! ```text
//! article → robust → readability → heuristic → rendered → raw
//! ```
//!
//! Every strategy owns its fetch, parse and acceptance logic and never lets an
//! error escape: failures become [`Attempt::Rejected`] with a warning.

mod article;
mod heuristic;
mod raw;
mod readability;
mod rendered;
mod robust;

pub use self::article::ArticleStrategy;
pub use self::heuristic::HeuristicStrategy;
pub use self::raw::RawStrategy;
pub use self::readability::ReadabilityStrategy;
pub use self::rendered::RenderedStrategy;
pub use self::robust::RobustStrategy;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::types::{ExtractionResult, Method};
use async_trait::async_trait;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of one strategy invocation.
#[derive(Debug)]
pub enum Attempt {
    Accepted(Box<ExtractionResult>),
    Rejected(Rejection),
}

#[derive(Debug)]
pub enum Rejection {
    Failed(ScrapeError),
    BelowThreshold { len: usize, min: usize },
    Empty,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Failed(e) => write!(f, "{}", e),
            Rejection::BelowThreshold { len, min } => {
                write!(f, "text too short ({} chars, need more than {})", len, min)
            }
            Rejection::Empty => f.write_str("no text extracted"),
        }
    }
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn method(&self) -> Method;

    /// Fetch and extract without judging quality.
    async fn extract(&self, url: &Url) -> Result<ExtractionResult>;

    /// Extract and apply this strategy's acceptance rule.
    async fn attempt(&self, url: &Url) -> Attempt {
        let method = self.method();
        info!("Attempting scrape with {}: {}", method, url);
        match self.extract(url).await {
            Ok(result) => accept(result),
            Err(e) => {
                warn!("{} failed: {}", method, e);
                Attempt::Rejected(Rejection::Failed(e))
            }
        }
    }
}

/// Apply the length gate for the result's method and mark it successful.
pub fn accept(mut result: ExtractionResult) -> Attempt {
    let len = result.text_len();
    if let Some(min) = result.method.min_text_len() {
        if len <= min {
            debug!("{} rejected: {} chars, need more than {}", result.method, len, min);
            return Attempt::Rejected(Rejection::BelowThreshold { len, min });
        }
    }
    if len == 0 {
        return Attempt::Rejected(Rejection::Empty);
    }
    result.dedup_lists();
    result.success = true;
    Attempt::Accepted(Box::new(result))
}

/// Run a third-party parser, turning a panic into a parse error.
pub(crate) fn guard_parse<T, F>(what: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|_| Err(ScrapeError::Parse(format!("{} panicked", what))))
}

/// Settings shared by every strategy.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub fetch_timeout: std::time::Duration,
    pub summary_chars: usize,
    pub max_images: usize,
}

impl From<&ScraperConfig> for StrategySettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            summary_chars: config.summary_chars,
            max_images: config.max_images,
        }
    }
}
