// Media acquirer: local cache, then remote API with archive/stream fallback

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::archive::ArchiveFetcher;
use super::config::Settings;
use super::errors::DownloadError;
use super::models::{artifact_path, MediaKind, RemoteResolution};
use super::resolver::ResolverClient;
use super::utils::media_id_of;

type FlightKey = (String, MediaKind);

/// Per-key locks so concurrent requests for one artifact share a single fetch
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<FlightKey, Arc<Mutex<()>>>>,
}

impl InFlight {
    async fn slot(&self, key: &FlightKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop the slot once only the map still references it
    async fn release(&self, key: &FlightKey, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().await;
        drop(slot);
        if slots.get(key).map_or(false, |s| Arc::strong_count(s) == 1) {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

pub struct MediaAcquirer {
    resolver: Arc<ResolverClient>,
    archive: ArchiveFetcher,
    download_dir: PathBuf,
    settings: Settings,
    in_flight: InFlight,
}

impl MediaAcquirer {
    pub fn new(settings: Settings, resolver: Arc<ResolverClient>, archive: ArchiveFetcher) -> Self {
        Self {
            resolver,
            archive,
            download_dir: settings.download_dir.clone(),
            settings,
            in_flight: InFlight::default(),
        }
    }

    /// Fetch the artifact for `link`, returning its cache path
    pub async fn acquire(&self, link: &str, kind: MediaKind) -> Result<PathBuf, DownloadError> {
        let media_id = media_id_of(link)?;
        tracing::info!(media_id, %kind, "starting download");

        let key = (media_id.to_string(), kind);
        let slot = self.in_flight.slot(&key).await;
        let result = {
            let _turn = slot.lock().await;
            self.acquire_once(media_id, kind).await
        };
        self.in_flight.release(&key, slot).await;

        result.map_err(|e| {
            tracing::error!(media_id, %kind, error = %e, "download failed");
            e.for_media(media_id)
        })
    }

    async fn acquire_once(&self, media_id: &str, kind: MediaKind) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let target = artifact_path(&self.download_dir, media_id, kind);

        if tokio::fs::try_exists(&target).await? {
            tracing::info!(media_id, %kind, "file exists locally");
            return Ok(target);
        }

        match self.resolver.resolve(media_id, kind).await {
            RemoteResolution::ArchiveRedirect(link) => {
                tracing::info!(media_id, %kind, link = %link, "archive link received");
                self.archive.fetch(&link, media_id, kind).await.map_err(|e| {
                    tracing::warn!(media_id, %kind, error = %e, "archive download failed");
                    e
                })
            }
            RemoteResolution::StreamLocation(url) => {
                tracing::info!(media_id, %kind, "stream URL obtained");
                self.stream_to_file(&url, &target, kind).await?;
                tracing::info!(media_id, %kind, "downloaded");
                Ok(target)
            }
            RemoteResolution::Failure(e) => Err(e),
        }
    }

    /// Stream `url` into `target` through a `.part` file, renamed on success
    async fn stream_to_file(&self, url: &str, target: &Path, kind: MediaKind) -> Result<(), DownloadError> {
        let mut response = self
            .resolver
            .http()
            .get(url)
            .timeout(self.settings.stream_timeout(kind))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DownloadError::UpstreamFailure(format!("stream download failed: HTTP {}", status)));
        }

        let partial = partial_path(target);
        let written = async {
            let file = tokio::fs::File::create(&partial).await?;
            let mut writer = tokio::io::BufWriter::with_capacity(self.settings.chunk_size, file);
            while let Some(chunk) = response.chunk().await? {
                writer.write_all(&chunk).await?;
            }
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
            Ok::<(), DownloadError>(())
        }
        .await;

        match written {
            Ok(()) => {
                tokio::fs::rename(&partial, target).await?;
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
