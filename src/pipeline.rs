//! Ordered fallback over the extraction strategies.

use crate::browser::Renderer;
use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::fetch::{jitter, Fetcher};
use crate::strategies::{
    ArticleStrategy, Attempt, HeuristicStrategy, RawStrategy, ReadabilityStrategy, Rejection,
    RenderedStrategy, RobustStrategy, Strategy, StrategySettings,
};
use crate::types::{ExtractionResult, Method};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};
use url::Url;

/// A parseable absolute URL with a non-empty host. Blank input is a missing URL.
pub fn validate_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScrapeError::MissingUrl);
    }
    let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ScrapeError::InvalidUrl(format!("{}: missing host", raw))),
    }
}

pub struct Pipeline {
    strategies: Vec<Box<dyn Strategy>>,
    delay: (Duration, Duration),
    deadline: Option<Duration>,
}

impl Pipeline {
    pub fn new(
        strategies: Vec<Box<dyn Strategy>>,
        delay: (Duration, Duration),
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            strategies,
            delay,
            deadline,
        }
    }

    /// The six strategies in priority order, sharing one fetcher.
    pub fn standard(
        config: &ScraperConfig,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let settings = StrategySettings::from(config);
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(ArticleStrategy::new(fetcher.clone(), settings.clone())),
            Box::new(RobustStrategy::new(fetcher.clone(), settings.clone())),
            Box::new(ReadabilityStrategy::new(fetcher.clone(), settings.clone())),
            Box::new(HeuristicStrategy::new(
                fetcher.clone(),
                settings.clone(),
                config.fetch_attempts,
                config.retry_delay(),
            )),
            Box::new(RenderedStrategy::new(renderer, settings.clone())),
            Box::new(RawStrategy::new(fetcher, settings)),
        ];
        Self::new(strategies, config.inter_attempt_delay(), config.deadline())
    }

    pub fn methods(&self) -> Vec<Method> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// First accepted result, stamped with elapsed time and a UTC timestamp.
    ///
    /// The URL is validated before any strategy runs. Strategies run strictly in
    /// order with a randomized pause after each rejection; once the deadline is
    /// spent no further strategy starts.
    pub async fn run(&self, raw_url: &str) -> Result<ExtractionResult> {
        let url = validate_url(raw_url)?;
        let source = raw_url.trim().to_string();
        let started = Instant::now();

        for (i, strategy) in self.strategies.iter().enumerate() {
            let attempt = match self.remaining(started) {
                Some(budget) if budget.is_zero() => {
                    warn!("Deadline reached before {} could run for {}", strategy.method(), url);
                    break;
                }
                Some(budget) => match tokio::time::timeout(budget, strategy.attempt(&url)).await {
                    Ok(attempt) => attempt,
                    Err(_) => {
                        warn!("{} cut off by the deadline for {}", strategy.method(), url);
                        Attempt::Rejected(Rejection::Failed(ScrapeError::Timeout(budget)))
                    }
                },
                None => strategy.attempt(&url).await,
            };

            match attempt {
                Attempt::Accepted(mut result) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    result.scrape_time = Some((elapsed * 100.0).round() / 100.0);
                    result.timestamp = Some(Utc::now().to_rfc3339());
                    result.source = source;
                    info!("Scraped {} with {} in {:.2}s", url, result.method, elapsed);
                    return Ok(*result);
                }
                Attempt::Rejected(reason) => {
                    info!("{} rejected for {}: {}", strategy.method(), url, reason);
                    if i + 1 < self.strategies.len() {
                        tokio::time::sleep(jitter(self.delay)).await;
                    }
                }
            }
        }

        error!("All scraping methods failed for {}", url);
        Err(ScrapeError::AllStrategiesFailed { url: source })
    }

    fn remaining(&self, started: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_sub(started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        TooShort,
        Hang,
    }

    struct FakeStrategy {
        method: Method,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for FakeStrategy {
        fn method(&self) -> Method {
            self.method
        }

        async fn extract(&self, url: &Url) -> Result<ExtractionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed => Ok(ExtractionResult::new(self.method, url.as_str(), "word ".repeat(60))),
                Behaviour::TooShort => Ok(ExtractionResult::new(self.method, url.as_str(), "tiny".into())),
                Behaviour::Fail => Err(ScrapeError::Fetch("connection refused".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ScrapeError::Fetch("unreachable".into()))
                }
            }
        }
    }

    fn pipeline(plan: &[(Method, Behaviour)], deadline: Option<Duration>) -> (Pipeline, Vec<Arc<AtomicUsize>>) {
        let mut counters = Vec::new();
        let strategies = plan
            .iter()
            .map(|&(method, behaviour)| {
                let calls = Arc::new(AtomicUsize::new(0));
                counters.push(calls.clone());
                Box::new(FakeStrategy { method, behaviour, calls }) as Box<dyn Strategy>
            })
            .collect();
        (Pipeline::new(strategies, (Duration::ZERO, Duration::ZERO), deadline), counters)
    }

    fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://ex.com/a").is_ok());
        assert!(matches!(validate_url("  "), Err(ScrapeError::MissingUrl)));
        assert!(matches!(validate_url("not-a-url"), Err(ScrapeError::InvalidUrl(_))));
        assert!(matches!(validate_url("mailto:someone@ex.com"), Err(ScrapeError::InvalidUrl(_))));
        assert!(matches!(validate_url("/relative/path"), Err(ScrapeError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_earlier_strategy_wins() {
        let (pipeline, counters) = pipeline(
            &[
                (Method::Article, Behaviour::Succeed),
                (Method::Robust, Behaviour::Fail),
                (Method::Readability, Behaviour::Succeed),
            ],
            None,
        );
        let result = pipeline.run("https://ex.com/a").await.unwrap();
        assert_eq!(result.method, Method::Article);
        assert!(result.success);
        assert!(result.scrape_time.is_some() && result.timestamp.is_some());
        assert_eq!(calls(&counters), vec![1, 0, 0]);
    }

    #[tokio::test]
    async fn test_falls_through_failures_and_short_text() {
        let (pipeline, counters) = pipeline(
            &[
                (Method::Article, Behaviour::Fail),
                (Method::Robust, Behaviour::TooShort),
                (Method::Readability, Behaviour::Succeed),
                (Method::Raw, Behaviour::Succeed),
            ],
            None,
        );
        let result = pipeline.run("https://ex.com/a").await.unwrap();
        assert_eq!(result.method, Method::Readability);
        assert_eq!(calls(&counters), vec![1, 1, 1, 0]);
    }

    #[tokio::test]
    async fn test_invalid_url_runs_nothing() {
        let (pipeline, counters) = pipeline(&[(Method::Raw, Behaviour::Succeed)], None);
        let err = pipeline.run("not-a-url").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL format");
        assert_eq!(calls(&counters), vec![0]);
    }

    #[tokio::test]
    async fn test_terminal_failure_carries_url() {
        let (pipeline, counters) = pipeline(
            &[(Method::Heuristic, Behaviour::Fail), (Method::Raw, Behaviour::Fail)],
            None,
        );
        match pipeline.run("https://down.example/x").await {
            Err(ScrapeError::AllStrategiesFailed { url }) => assert_eq!(url, "https://down.example/x"),
            other => panic!("expected terminal failure, got {:?}", other),
        }
        assert_eq!(calls(&counters), vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_the_cascade() {
        let (pipeline, counters) = pipeline(
            &[(Method::Rendered, Behaviour::Hang), (Method::Raw, Behaviour::Succeed)],
            Some(Duration::from_secs(90)),
        );
        let err = pipeline.run("https://slow.example/").await.unwrap_err();
        assert!(matches!(err, ScrapeError::AllStrategiesFailed { .. }));
        assert_eq!(calls(&counters), vec![1, 0]);
    }

    #[test]
    fn test_standard_order() {
        use crate::browser::DisabledRenderer;
        use crate::fetch::testing::StaticFetcher;

        let pipeline = Pipeline::standard(
            &ScraperConfig::default(),
            Arc::new(StaticFetcher::default()),
            Arc::new(DisabledRenderer),
        );
        assert_eq!(pipeline.methods(), Method::ALL.to_vec());
    }
}
