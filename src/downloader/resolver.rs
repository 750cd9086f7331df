// Remote API client: lazily bootstrapped base address + download lookups

use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use super::config::Settings;
use super::errors::DownloadError;
use super::models::{ApiResponse, MediaKind, RemoteResolution};
use super::utils::MIN_MEDIA_ID_LEN;

/// Marker of an archive-channel link in API responses
const ARCHIVE_DOMAIN: &str = "t.me";

/// Remote API base address, fetched once from the bootstrap URL.
///
/// Reads are concurrent; bootstrap and refresh are serialized so only one
/// fetch is in flight at a time.
pub struct ResolverAddress {
    bootstrap_url: String,
    bootstrap_timeout: Duration,
    current: RwLock<Option<String>>,
    refresh_lock: Mutex<()>,
}

impl ResolverAddress {
    pub fn new(bootstrap_url: impl Into<String>, bootstrap_timeout: Duration) -> Self {
        Self {
            bootstrap_url: bootstrap_url.into(),
            bootstrap_timeout,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_address(self, address: Option<String>) -> Self {
        Self {
            current: RwLock::new(address),
            ..self
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Cached address, bootstrapping it if still unset
    pub async fn get(&self, client: &reqwest::Client) -> Result<String, DownloadError> {
        if let Some(address) = self.current().await {
            return Ok(address);
        }

        let _guard = self.refresh_lock.lock().await;
        // another task may have finished the bootstrap while we waited
        if let Some(address) = self.current().await {
            return Ok(address);
        }
        self.fetch_and_store(client).await
    }

    /// Re-fetch the address unconditionally (operator action)
    pub async fn refresh(&self, client: &reqwest::Client) -> Result<String, DownloadError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store(client).await
    }

    async fn fetch_and_store(&self, client: &reqwest::Client) -> Result<String, DownloadError> {
        let response = client
            .get(&self.bootstrap_url)
            .timeout(self.bootstrap_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error loading resolver address");
                DownloadError::ResolverUnavailable(e.to_string())
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(status = %status, "failed to fetch resolver address");
            return Err(DownloadError::ResolverUnavailable(format!("bootstrap returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::ResolverUnavailable(e.to_string()))?;
        let address = body.trim().trim_end_matches('/').to_string();
        if address.is_empty() {
            tracing::error!("bootstrap returned an empty resolver address");
            return Err(DownloadError::ResolverUnavailable("empty bootstrap body".to_string()));
        }

        *self.current.write().await = Some(address.clone());
        tracing::info!(address = %address, "resolver address loaded");
        Ok(address)
    }
}

/// Asks the remote API where the bytes for a media id can be found
pub struct ResolverClient {
    client: reqwest::Client,
    address: ResolverAddress,
    resolve_timeout: Duration,
}

impl ResolverClient {
    pub fn new(settings: &Settings, client: reqwest::Client) -> Self {
        let address = ResolverAddress::new(settings.bootstrap_url.clone(), settings.bootstrap_timeout)
            .with_address(settings.api_url.clone());
        Self {
            client,
            address,
            resolve_timeout: settings.resolve_timeout,
        }
    }

    pub fn address(&self) -> &ResolverAddress {
        &self.address
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn refresh(&self) -> Result<String, DownloadError> {
        self.address.refresh(&self.client).await
    }

    /// Look up a media id; every failure is folded into `RemoteResolution::Failure`
    pub async fn resolve(&self, media_id: &str, kind: MediaKind) -> RemoteResolution {
        match self.try_resolve(media_id, kind).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(media_id, %kind, error = %e, "resolve failed");
                RemoteResolution::Failure(e)
            }
        }
    }

    async fn try_resolve(&self, media_id: &str, kind: MediaKind) -> Result<RemoteResolution, DownloadError> {
        if media_id.chars().count() < MIN_MEDIA_ID_LEN {
            return Err(DownloadError::InvalidInput(format!("media id '{}' too short", media_id)));
        }

        let base = self.address.get(&self.client).await?;

        let response = self
            .client
            .get(format!("{}/download", base))
            .query(&[("url", media_id), ("type", kind.as_str())])
            .timeout(self.resolve_timeout)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DownloadError::UpstreamFailure(format!("API error: HTTP {}", status)));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| DownloadError::UpstreamFailure(format!("invalid response: {}", e)))?;
        Ok(classify(body))
    }
}

/// Archive links win over stream URLs when both are present
pub fn classify(body: ApiResponse) -> RemoteResolution {
    if let Some(link) = body.link.filter(|l| l.contains(ARCHIVE_DOMAIN)) {
        return RemoteResolution::ArchiveRedirect(link);
    }
    match (body.status.as_deref(), body.stream_url) {
        (Some("success"), Some(url)) if !url.is_empty() => RemoteResolution::StreamLocation(url),
        _ => RemoteResolution::Failure(DownloadError::UpstreamFailure("invalid response".to_string())),
    }
}
