use crate::error::{Result, ScrapeError};
use crate::headers::HeaderPool;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use rand::Rng;
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Raw page as returned by a fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub html: String,
}

impl FetchedPage {
    /// URL relative links resolve against: the post-redirect URL when it parses.
    pub fn base_url(&self, requested: &Url) -> Url {
        Url::parse(&self.final_url).unwrap_or_else(|_| requested.clone())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx page into [`ScrapeError::Status`], for callers that only
    /// accept successful responses.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScrapeError::Status(self.status))
        }
    }
}

/// Single HTTP GET of a page. Any completed response is returned, whatever its
/// status; only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage>;
}

/// reqwest-backed fetcher sending rotated browser headers.
pub struct HttpFetcher {
    client: Client,
    headers: Arc<HeaderPool>,
}

impl HttpFetcher {
    pub fn new(client: Client, headers: Arc<HeaderPool>) -> Self {
        Self { client, headers }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.as_str())
            .headers(self.headers.random())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Fetch(format!("Failed to read response body: {}", e)))?;

        debug!("Fetched {} ({} bytes, status {})", final_url, html.len(), status);
        Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            html,
        })
    }
}

/// Fetch with up to `attempts` tries, sleeping a random interval from `delay`
/// between tries. A non-2xx response counts as a failed try. The error of the
/// last try is returned.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &Url,
    timeout: Duration,
    attempts: u32,
    delay: (Duration, Duration),
) -> Result<FetchedPage> {
    let attempts = attempts.max(1);
    let (lo, hi) = delay;
    let mid = (lo + hi) / 2;
    let spread = if mid.is_zero() {
        0.0
    } else {
        (hi - mid).as_secs_f64() / mid.as_secs_f64()
    };
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(mid)
        .with_randomization_factor(spread)
        .with_multiplier(1.0)
        .with_max_interval(hi)
        .with_max_elapsed_time(None)
        .build();

    let tries = AtomicU32::new(0);
    let tries = &tries;
    retry(policy, move || async move {
        let attempt = tries.fetch_add(1, Ordering::SeqCst) + 1;
        match fetcher.fetch(url, timeout).await.and_then(FetchedPage::ensure_success) {
            Ok(page) => Ok(page),
            Err(e) if attempt >= attempts => Err(backoff::Error::permanent(e)),
            Err(e) => {
                warn!("Fetch attempt {}/{} for {} failed: {}", attempt, attempts, url, e);
                Err(backoff::Error::transient(e))
            }
        }
    })
    .await
}

/// Uniformly random duration in `[lo, hi]`.
pub fn jitter((lo, hi): (Duration, Duration)) -> Duration {
    if hi <= lo {
        return lo;
    }
    let ms = rand::thread_rng().gen_range(lo.as_millis()..=hi.as_millis());
    Duration::from_millis(ms as u64)
}


#[cfg(test)]
mod tests {
    use super::testing::StaticFetcher;
    use super::*;

    const NO_DELAY: (Duration, Duration) = (Duration::ZERO, Duration::ZERO);

    fn url() -> Url {
        Url::parse("https://ex.com/a").unwrap()
    }

    #[tokio::test]
    async fn test_retry_recovers_before_last_attempt() {
        let fetcher = StaticFetcher::default().with_page("https://ex.com/a", "<p>ok</p>").failing_first(2);
        let page = fetch_with_retry(&fetcher, &url(), Duration::from_secs(1), 3, NO_DELAY)
            .await
            .unwrap();
        assert_eq!(page.html, "<p>ok</p>");
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let fetcher = StaticFetcher::default();
        let err = fetch_with_retry(&fetcher, &url(), Duration::from_secs(1), 3, NO_DELAY)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch(_)));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_treats_error_status_as_failure() {
        let fetcher = StaticFetcher::default().with_status_page("https://ex.com/a", 503, "<p>busy</p>");
        let err = fetch_with_retry(&fetcher, &url(), Duration::from_secs(1), 3, NO_DELAY)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Status(503)));
        assert_eq!(fetcher.calls(), 3);
    }

    #[test]
    fn test_ensure_success() {
        let page = |status| FetchedPage {
            status,
            final_url: "https://ex.com/a".into(),
            html: String::new(),
        };
        assert!(page(204).ensure_success().is_ok());
        assert!(matches!(page(403).ensure_success(), Err(ScrapeError::Status(403))));
        assert!(matches!(page(301).ensure_success(), Err(ScrapeError::Status(301))));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let range = (Duration::from_millis(500), Duration::from_millis(1500));
        for _ in 0..50 {
            let d = jitter(range);
            assert!(d >= range.0 && d <= range.1);
        }
        assert_eq!(jitter(NO_DELAY), Duration::ZERO);
    }
}
