// Public facade used by the chat front end

use std::sync::Arc;

use crate::downloader::extractors::{ExtractionBridge, ExtractionTool, ExtractorConfig, YtDlpCli};
use crate::downloader::metadata::{MetadataResolver, SearchService, YtDlpSearch};
use crate::downloader::utils::{is_youtube_link, normalize_link, PLAYLIST_BASE, WATCH_BASE};
use crate::downloader::{
    ArchiveFetcher, ChatMessage, CookiePool, Delivery, DownloadError, DownloadIntent, EntityKind, FormatDescriptor,
    MediaAcquirer, MediaKind, MessageEntity, MessagingClient, ResolverClient, Settings, SliderEntry, Track,
    VideoDetails,
};

pub struct YouTube {
    resolver: Arc<ResolverClient>,
    acquirer: MediaAcquirer,
    metadata: MetadataResolver,
    extraction: ExtractionBridge,
}

impl YouTube {
    /// Facade with the yt-dlp backed search and extractor
    pub fn new(settings: Settings, messaging: Arc<dyn MessagingClient>) -> Result<Self, DownloadError> {
        let config = ExtractorConfig::default()
            .with_proxy(settings.proxy.clone())
            .with_timeout(settings.extractor_timeout);
        let cli = Arc::new(YtDlpCli::new(settings.ytdlp_path.clone(), config));
        let search = Arc::new(YtDlpSearch::new(cli.clone()));
        Self::with_backends(settings, messaging, search, cli)
    }

    /// Facade with caller-provided search and extraction backends
    pub fn with_backends(
        settings: Settings,
        messaging: Arc<dyn MessagingClient>,
        search: Arc<dyn SearchService>,
        tool: Arc<dyn ExtractionTool>,
    ) -> Result<Self, DownloadError> {
        let http = settings.http_client()?;
        let resolver = Arc::new(ResolverClient::new(&settings, http));
        let archive = ArchiveFetcher::new(
            messaging,
            settings.download_dir.clone(),
            settings.archive_poll_interval,
            settings.archive_poll_ceiling,
        );
        let extraction = ExtractionBridge::new(tool, CookiePool::new(settings.cookies_dir.clone()));
        let acquirer = MediaAcquirer::new(settings, resolver.clone(), archive);

        Ok(Self {
            resolver,
            acquirer,
            metadata: MetadataResolver::new(search),
            extraction,
        })
    }

    /// Best-effort startup bootstrap of the resolver address
    pub async fn warm_up(&self) {
        if let Err(e) = self.resolver.address().get(self.resolver.http()).await {
            tracing::warn!(error = %e, "resolver bootstrap failed; will retry on first download");
        }
    }

    /// Re-fetch the resolver address (operator action)
    pub async fn refresh_resolver(&self) -> Result<String, DownloadError> {
        self.resolver.refresh().await
    }

    pub fn exists(&self, link: &str, videoid: bool) -> bool {
        is_youtube_link(&with_base(link, videoid, WATCH_BASE))
    }

    /// First link in the message or the message it replies to
    pub fn url_from_message(message: &ChatMessage) -> Option<String> {
        std::iter::once(message)
            .chain(message.reply_to.as_deref())
            .find_map(link_in_message)
    }

    /// Free-text or link search, at most `limit` results
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoDetails>, DownloadError> {
        self.metadata.lookup(query, limit).await
    }

    pub async fn details(&self, link: &str, videoid: bool) -> Result<VideoDetails, DownloadError> {
        self.metadata.details(&prepare(link, videoid)).await
    }

    pub async fn title(&self, link: &str, videoid: bool) -> Result<String, DownloadError> {
        self.metadata.title(&prepare(link, videoid)).await
    }

    pub async fn duration(&self, link: &str, videoid: bool) -> Result<Option<String>, DownloadError> {
        self.metadata.duration(&prepare(link, videoid)).await
    }

    pub async fn thumbnail(&self, link: &str, videoid: bool) -> Result<String, DownloadError> {
        self.metadata.thumbnail(&prepare(link, videoid)).await
    }

    /// Track record plus its id
    pub async fn track(&self, link: &str, videoid: bool) -> Result<(Track, String), DownloadError> {
        let track = self.metadata.track(&prepare(link, videoid)).await?;
        let id = track.vidid.clone();
        Ok((track, id))
    }

    pub async fn slider(&self, link: &str, index: usize, videoid: bool) -> Result<SliderEntry, DownloadError> {
        self.metadata.slider(&prepare(link, videoid), index).await
    }

    pub async fn video(&self, link: &str, videoid: bool) -> Delivery {
        deliver(self.acquirer.acquire(&prepare(link, videoid), MediaKind::Video).await, "Video download failed")
    }

    pub async fn playlist(&self, link: &str, limit: usize, videoid: bool) -> Vec<String> {
        let link = normalize_link(&with_base(link, videoid, PLAYLIST_BASE)).to_string();
        self.extraction.list_playlist_ids(&link, limit).await
    }

    /// Formats for the link, and the link they were listed for
    pub async fn formats(&self, link: &str, videoid: bool) -> (Vec<FormatDescriptor>, String) {
        let link = prepare(link, videoid);
        (self.extraction.list_formats(&link).await, link)
    }

    /// Total size of all formats; None when the extractor cannot tell
    pub async fn file_size(&self, link: &str, videoid: bool) -> Option<u64> {
        match self.extraction.estimate_size(&prepare(link, videoid)).await {
            Ok(total) => Some(total),
            Err(e) => {
                tracing::warn!(link, error = %e, "size estimate unavailable");
                None
            }
        }
    }

    /// Download by intent. The remote API serves one rendition per kind, so
    /// `format_id` and `title` are only recorded.
    pub async fn download(
        &self,
        link: &str,
        intent: DownloadIntent,
        videoid: bool,
        format_id: Option<&str>,
        title: Option<&str>,
    ) -> Delivery {
        let link = with_base(link, videoid, WATCH_BASE);
        tracing::debug!(link = %link, ?intent, format_id, title, "download requested");
        deliver(self.acquirer.acquire(&link, intent.kind()).await, "Download failed")
    }
}

fn with_base(link: &str, videoid: bool, base: &str) -> String {
    if videoid {
        format!("{}{}", base, link)
    } else {
        link.to_string()
    }
}

fn prepare(link: &str, videoid: bool) -> String {
    normalize_link(&with_base(link, videoid, WATCH_BASE)).to_string()
}

fn deliver(result: Result<std::path::PathBuf, DownloadError>, context: &str) -> Delivery {
    match result {
        Ok(path) => Delivery::ok(path),
        Err(e) => Delivery::failed(format!("{}: {}", context, e)),
    }
}

fn link_in_message(message: &ChatMessage) -> Option<String> {
    let text = message.text.as_deref().or(message.caption.as_deref());
    let bare = message
        .entities
        .iter()
        .find(|e| e.kind == EntityKind::Url)
        .and_then(|e| text.and_then(|t| utf16_slice(t, e)));
    if bare.is_some() {
        return bare;
    }
    message.caption_entities.iter().find_map(|e| match &e.kind {
        EntityKind::TextLink(url) => Some(url.clone()),
        _ => None,
    })
}

/// Entity offsets count UTF-16 code units, not bytes or chars
fn utf16_slice(text: &str, entity: &MessageEntity) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = entity.offset.checked_add(entity.length)?;
    let span = units.get(entity.offset..end)?;
    String::from_utf16(span).ok()
}
