// Error types for the resolution and fetch pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Malformed link, empty or too-short media id
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote API base address could not be obtained
    #[error("Resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// Non-200 status or malformed JSON from a remote endpoint
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Archive message missing or its file never materialized
    #[error("Archive file not found: {0}")]
    ArchiveNotFound(String),

    /// A network or subprocess call exceeded its bound
    #[error("Timed out: {0}")]
    TransportTimeout(String),

    /// The external extractor failed to start or exited non-zero
    #[error("Extraction tool failed: {0}")]
    ExtractionToolFailure(String),

    /// A metadata query produced no results
    #[error("No results: {0}")]
    EmptyResult(String),

    /// No credential file in the cookie pool
    #[error("No credentials available in {0}")]
    CredentialsUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Attach the media id to a failure so the facade can report it
    pub fn for_media(self, media_id: &str) -> Self {
        match self {
            Self::UpstreamFailure(msg) => Self::UpstreamFailure(format!("{}: {}", media_id, msg)),
            Self::TransportTimeout(msg) => Self::TransportTimeout(format!("{}: {}", media_id, msg)),
            Self::Io(e) => Self::UpstreamFailure(format!("{}: {}", media_id, e)),
            other => other,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::TransportTimeout(e.to_string());
        }
        if e.is_decode() {
            return Self::UpstreamFailure(format!("invalid response body: {}", e));
        }
        Self::UpstreamFailure(e.to_string())
    }
}
