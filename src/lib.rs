pub mod api;
pub mod browser;
pub mod config;
pub mod content;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod strategies;
pub mod tables;
pub mod types;

use anyhow::Context;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use browser::{ChromeRenderer, DisabledRenderer, RenderOptions, Renderer};
use config::ScraperConfig;
use fetch::{Fetcher, HttpFetcher};
use headers::HeaderPool;
use pipeline::Pipeline;

pub use error::{Result, ScrapeError};
pub use types::*;

pub const CERT_DIR: &str = "/app/certificates";

pub struct AppState {
    pub config: ScraperConfig,
    pub pipeline: Pipeline,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("strategies", &self.pipeline.methods())
            .field("browser_enabled", &self.config.browser_enabled)
            .finish()
    }
}

impl AppState {
    /// Production wiring: reqwest fetcher, and Chrome unless the browser is disabled.
    pub fn new(config: ScraperConfig, http_client: reqwest::Client) -> Self {
        let headers = Arc::new(HeaderPool::new(config.user_agents.clone()));
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(http_client, headers.clone()));
        let renderer: Arc<dyn Renderer> = if config.browser_enabled {
            Arc::new(ChromeRenderer::new(RenderOptions::from(&config), headers))
        } else {
            Arc::new(DisabledRenderer)
        };
        Self::with_collaborators(config, fetcher, renderer)
    }

    pub fn with_collaborators(
        config: ScraperConfig,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let pipeline = Pipeline::standard(&config, fetcher, renderer);
        Self { config, pipeline }
    }
}

pub fn build_http_client() -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .deflate(true);

    if let Ok(ca_cert_name) = env::var("TLS_CA_CERT") {
        let cert_path = Path::new(CERT_DIR).join(&ca_cert_name);
        let pem = std::fs::read(&cert_path)
            .with_context(|| format!("Failed to read TLS CA certificate at {}", cert_path.display()))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .with_context(|| format!("Failed to parse TLS CA certificate at {}", cert_path.display()))?;
        info!("Loaded TLS CA certificate from {}", cert_path.display());
        builder = builder.add_root_certificate(cert);
    }

    builder.build().context("Failed to build HTTP client")
}
