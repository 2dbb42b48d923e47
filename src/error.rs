use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("URL parameter is required")]
    MissingUrl,

    #[error("Invalid URL format")]
    InvalidUrl(String),

    #[error("Failed to fetch URL: {0}")]
    Fetch(String),

    #[error("Request failed with status {0}")]
    Status(u16),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("All scraping methods failed")]
    AllStrategiesFailed { url: String },
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ScrapeError::Status(status.as_u16()),
            None => ScrapeError::Fetch(e.to_string()),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
