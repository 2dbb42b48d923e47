use crate::error::ScrapeError;
use crate::types::{ErrorResponse, ExtractionResult, Method, ScrapeRequest};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/scrape", get(scrape_get).post(scrape_post))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let (status, url) = match &self {
            ScrapeError::MissingUrl | ScrapeError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, None),
            ScrapeError::AllStrategiesFailed { url } => (StatusCode::INTERNAL_SERVER_ERROR, Some(url.clone())),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            success: false,
            url,
        };
        (status, Json(body)).into_response()
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Json<Value> {
    let strategies: Vec<String> = state
        .pipeline
        .methods()
        .iter()
        .map(|m: &Method| format!("{} - {}", m, m.description()))
        .collect();
    Json(json!({
        "service": "Web Scraper API",
        "version": "2.0",
        "endpoints": {
            "/scrape": {
                "methods": ["GET", "POST"],
                "description": "Scrape content from a URL",
                "parameters": { "url": "The URL to scrape (required)" },
                "example": "/scrape?url=https://example.com/article"
            },
            "/health": {
                "methods": ["GET"],
                "description": "Health check endpoint"
            }
        },
        "strategies": strategies,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "web-scraper-api"
    }))
}

/// A query string that cannot be decoded (a repeated `url`, say) is an invalid URL.
async fn scrape_get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScrapeRequest>, QueryRejection>,
) -> Result<Json<ExtractionResult>, ScrapeError> {
    let Query(request) = query.map_err(|e| ScrapeError::InvalidUrl(e.body_text()))?;
    scrape(&state, request.url).await
}

/// The body is parsed by hand so a missing or non-JSON body reads as a missing URL.
async fn scrape_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ExtractionResult>, ScrapeError> {
    let url = serde_json::from_slice::<ScrapeRequest>(&body)
        .ok()
        .and_then(|request| request.url);
    scrape(&state, url).await
}

async fn scrape(state: &AppState, url: Option<String>) -> Result<Json<ExtractionResult>, ScrapeError> {
    let url = url.filter(|u| !u.trim().is_empty()).ok_or(ScrapeError::MissingUrl)?;
    let span = info_span!("scrape", request_id = %Uuid::new_v4(), url = %url);
    state
        .pipeline
        .run(&url)
        .instrument(span)
        .await
        .map(Json)
        .inspect_err(|e| {
            if !matches!(e, ScrapeError::MissingUrl | ScrapeError::InvalidUrl(_)) {
                error!("Scrape error for {}: {}", url, e);
            }
        })
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };
    error!("Handler panicked: {}", message);
    let body = ErrorResponse {
        error: message,
        success: false,
        url: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
