use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use article_scraper::{api, build_http_client, config::ScraperConfig, AppState, CERT_DIR};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ScraperConfig::from_env();
    info!("Starting web scraper API");
    info!(
        "Browser rendering: {}, deadline: {:?}",
        if config.browser_enabled { "enabled" } else { "disabled" },
        config.deadline()
    );

    let http_client = build_http_client()?;
    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    let state = Arc::new(AppState::new(config, http_client));
    let app = api::router(state);

    let tls_cert = env::var("TLS_HOST_CERT").ok();
    let tls_key = env::var("TLS_HOST_KEY").ok();

    match (tls_cert, tls_key) {
        (Some(cert_name), Some(key_name)) => {
            let cert_path = Path::new(CERT_DIR).join(cert_name);
            let key_path = Path::new(CERT_DIR).join(key_name);
            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
            info!("Scraper listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        (cert, key) => {
            if cert.is_some() || key.is_some() {
                warn!("TLS_HOST_CERT and TLS_HOST_KEY must both be set to enable inbound TLS. Falling back to HTTP.");
            }
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Scraper listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
