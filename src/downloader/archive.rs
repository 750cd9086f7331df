// Archive fetcher: pulls previously uploaded files out of the archive channel

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use super::errors::DownloadError;
use super::models::{artifact_path, ArchiveLocator, ChannelRef, MediaKind};

/// Handle to a message found in the archive channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedMessage {
    pub locator: ArchiveLocator,
    /// Name of the attached file, when the client knows it
    pub file_name: Option<String>,
}

/// Messaging client that can read the archive channel.
///
/// `download_media` only has to start the transfer; the fetcher waits for
/// the file to appear on disk.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn get_message(&self, locator: &ArchiveLocator) -> Result<Option<ArchivedMessage>, DownloadError>;

    async fn download_media(&self, message: &ArchivedMessage, target: &Path) -> Result<(), DownloadError>;
}

/// Stand-in used when the host has not wired a messaging client
pub struct UnconfiguredArchive;

#[async_trait]
impl MessagingClient for UnconfiguredArchive {
    async fn get_message(&self, locator: &ArchiveLocator) -> Result<Option<ArchivedMessage>, DownloadError> {
        tracing::warn!(%locator, "no messaging client configured; archive lookups always miss");
        Ok(None)
    }

    async fn download_media(&self, message: &ArchivedMessage, _target: &Path) -> Result<(), DownloadError> {
        Err(DownloadError::ArchiveNotFound(message.locator.to_string()))
    }
}

/// Parse `/<channel>/<msg>` or `/c/<internal id>/<msg>`.
///
/// A first segment of exactly `c` always means the internal form, so a
/// public channel literally named "c" cannot be addressed. The message id
/// is the last segment of the internal form.
pub fn parse_archive_link(link: &str) -> Result<ArchiveLocator, DownloadError> {
    let invalid = |why: &str| DownloadError::InvalidInput(format!("archive link {}: {}", link, why));

    let url = Url::parse(link).map_err(|e| invalid(&e.to_string()))?;
    let parts: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let (channel, message_part) = match parts.as_slice() {
        ["c", internal_id, rest @ ..] => (
            ChannelRef::Internal(internal_id.to_string()),
            rest.last().copied().unwrap_or(*internal_id),
        ),
        [channel, message, ..] => (ChannelRef::Public(channel.to_string()), *message),
        _ => return Err(invalid("expected /<channel>/<message id>")),
    };

    let message_id = message_part
        .parse::<i64>()
        .map_err(|_| invalid("message id is not numeric"))?;

    Ok(ArchiveLocator { channel, message_id })
}

pub struct ArchiveFetcher {
    client: std::sync::Arc<dyn MessagingClient>,
    download_dir: PathBuf,
    poll_interval: Duration,
    poll_ceiling: Duration,
}

impl ArchiveFetcher {
    pub fn new(
        client: std::sync::Arc<dyn MessagingClient>,
        download_dir: impl Into<PathBuf>,
        poll_interval: Duration,
        poll_ceiling: Duration,
    ) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            poll_interval,
            poll_ceiling,
        }
    }

    /// Materialize the archived file for `media_id` at its cache path
    pub async fn fetch(&self, archive_link: &str, media_id: &str, kind: MediaKind) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let target = artifact_path(&self.download_dir, media_id, kind);

        if tokio::fs::try_exists(&target).await? {
            tracing::info!(media_id, "archive file already cached");
            return Ok(target);
        }

        let locator = parse_archive_link(archive_link).map_err(|e| {
            tracing::error!(link = archive_link, error = %e, "invalid archive link format");
            DownloadError::ArchiveNotFound(format!("invalid archive link: {}", archive_link))
        })?;

        tracing::info!(channel = %locator.channel, message_id = locator.message_id, "downloading from archive");

        let message = self
            .client
            .get_message(&locator)
            .await?
            .ok_or_else(|| {
                tracing::error!(%locator, "archive message not found");
                DownloadError::ArchiveNotFound(format!("message {} not found", locator))
            })?;

        self.client.download_media(&message, &target).await?;

        if wait_for_file(&target, self.poll_interval, self.poll_ceiling).await {
            tracing::info!(media_id, "archive download complete");
            Ok(target)
        } else {
            tracing::error!(media_id, ceiling_secs = self.poll_ceiling.as_secs_f64(), "archive download timed out");
            Err(DownloadError::ArchiveNotFound(format!(
                "{} did not materialize within {}s",
                locator,
                self.poll_ceiling.as_secs_f64()
            )))
        }
    }
}

/// Poll until `path` exists or `ceiling` elapses
pub async fn wait_for_file(path: &Path, interval: Duration, ceiling: Duration) -> bool {
    let deadline = Instant::now() + ceiling;
    loop {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}
