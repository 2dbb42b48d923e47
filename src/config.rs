use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::headers::DEFAULT_USER_AGENTS;

/// Runtime configuration for the scraping service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Interface the HTTP server binds to (default: 0.0.0.0)
    pub bind_addr: String,

    /// HTTP server port (default: 5000)
    pub port: u16,

    /// Per-request timeout for direct HTTP fetches in seconds (default: 15)
    pub fetch_timeout_secs: u64,

    /// Fetch attempts made by the heuristic scanner (default: 3)
    pub fetch_attempts: u32,

    /// Randomized wait between fetch retries, in milliseconds (default: 1000..3000)
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,

    /// Randomized wait between strategies, in milliseconds (default: 500..1500)
    pub inter_attempt_delay_min_ms: u64,
    pub inter_attempt_delay_max_ms: u64,

    /// Upper bound on a whole pipeline run in seconds; 0 disables it (default: 90)
    pub deadline_secs: u64,

    /// Characters kept in truncated summaries (default: 500)
    pub summary_chars: usize,

    /// Cap on collected image URLs (default: 10)
    pub max_images: usize,

    /// Whether the rendered-DOM strategy may launch a browser (default: true)
    pub browser_enabled: bool,

    /// Whether the browser runs headless (default: true)
    pub browser_headless: bool,

    /// Wait for an `<article>` element, in seconds (default: 10)
    pub browser_wait_secs: u64,

    /// Fixed wait when no `<article>` shows up, in seconds (default: 3)
    pub browser_fallback_wait_secs: u64,

    /// Wait after scrolling for lazy content, in seconds (default: 1)
    pub browser_settle_secs: u64,

    /// Explicit Chrome/Chromium binary
    pub chrome_executable: Option<String>,

    /// User agents for header rotation
    pub user_agents: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            fetch_timeout_secs: 15,
            fetch_attempts: 3,
            retry_delay_min_ms: 1000,
            retry_delay_max_ms: 3000,
            inter_attempt_delay_min_ms: 500,
            inter_attempt_delay_max_ms: 1500,
            deadline_secs: 90,
            summary_chars: 500,
            max_images: 10,
            browser_enabled: true,
            browser_headless: true,
            browser_wait_secs: 10,
            browser_fallback_wait_secs: 3,
            browser_settle_secs: 1,
            chrome_executable: None,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScraperConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("BIND_ADDR", &mut config.bind_addr);
        override_from_env("PORT", &mut config.port);
        override_from_env("FETCH_TIMEOUT_SECS", &mut config.fetch_timeout_secs);
        override_from_env("FETCH_ATTEMPTS", &mut config.fetch_attempts);
        override_from_env("FETCH_RETRY_DELAY_MS_MIN", &mut config.retry_delay_min_ms);
        override_from_env("FETCH_RETRY_DELAY_MS_MAX", &mut config.retry_delay_max_ms);
        override_from_env("INTER_ATTEMPT_DELAY_MS_MIN", &mut config.inter_attempt_delay_min_ms);
        override_from_env("INTER_ATTEMPT_DELAY_MS_MAX", &mut config.inter_attempt_delay_max_ms);
        override_from_env("SCRAPE_DEADLINE_SECS", &mut config.deadline_secs);
        override_from_env("SUMMARY_CHARS", &mut config.summary_chars);
        override_from_env("MAX_IMAGES", &mut config.max_images);
        override_from_env("BROWSER_ENABLED", &mut config.browser_enabled);
        override_from_env("BROWSER_HEADLESS", &mut config.browser_headless);
        override_from_env("BROWSER_WAIT_SECS", &mut config.browser_wait_secs);
        override_from_env("BROWSER_FALLBACK_WAIT_SECS", &mut config.browser_fallback_wait_secs);
        override_from_env("BROWSER_SETTLE_SECS", &mut config.browser_settle_secs);
        if let Ok(path) = env::var("CHROME_EXECUTABLE") {
            if !path.trim().is_empty() {
                config.chrome_executable = Some(path);
            }
        }
        if let Ok(agents) = env::var("USER_AGENTS") {
            let agents: Vec<String> = agents
                .split('|')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            if !agents.is_empty() {
                config.user_agents = agents;
            }
        }
        config
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> (Duration, Duration) {
        ordered_range(self.retry_delay_min_ms, self.retry_delay_max_ms)
    }

    pub fn inter_attempt_delay(&self) -> (Duration, Duration) {
        ordered_range(self.inter_attempt_delay_min_ms, self.inter_attempt_delay_max_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }

    pub fn browser_wait(&self) -> Duration {
        Duration::from_secs(self.browser_wait_secs)
    }

    pub fn browser_fallback_wait(&self) -> Duration {
        Duration::from_secs(self.browser_fallback_wait_secs)
    }

    pub fn browser_settle(&self) -> Duration {
        Duration::from_secs(self.browser_settle_secs)
    }

    /// Zero delays everywhere; used by tests and local tooling.
    pub fn without_delays(mut self) -> Self {
        self.retry_delay_min_ms = 0;
        self.retry_delay_max_ms = 0;
        self.inter_attempt_delay_min_ms = 0;
        self.inter_attempt_delay_max_ms = 0;
        self.browser_fallback_wait_secs = 0;
        self.browser_settle_secs = 0;
        self
    }
}

fn ordered_range(a: u64, b: u64) -> (Duration, Duration) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (Duration::from_millis(lo), Duration::from_millis(hi))
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = env::var(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn!("Ignoring unparsable {}={:?}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.fetch_attempts, 3);
        assert_eq!(
            config.inter_attempt_delay(),
            (Duration::from_millis(500), Duration::from_millis(1500))
        );
        assert_eq!(config.deadline(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_ranges_are_ordered_and_deadline_can_be_disabled() {
        let config = ScraperConfig {
            retry_delay_min_ms: 3000,
            retry_delay_max_ms: 1000,
            deadline_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(), (Duration::from_millis(1000), Duration::from_millis(3000)));
        assert_eq!(config.deadline(), None);
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: ScraperConfig = serde_json::from_str(r#"{"port": 8080, "browser_enabled": false}"#).unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.browser_enabled);
        assert_eq!(config.summary_chars, 500);
    }
}
