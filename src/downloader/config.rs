// Runtime settings for the resolver pipeline

use std::path::PathBuf;
use std::time::Duration;

/// Paste holding the current remote API address
pub const DEFAULT_BOOTSTRAP_URL: &str = "https://pastebin.com/raw/rLsBhAQa";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Where cached artifacts live
    pub download_dir: PathBuf,
    /// Pool of `*.txt` cookie files for the extractor
    pub cookies_dir: PathBuf,
    pub bootstrap_url: String,
    /// Pre-seeded remote API address; skips the bootstrap fetch
    pub api_url: Option<String>,
    /// Extractor binary; located on the system when unset
    pub ytdlp_path: Option<String>,
    /// SOCKS5/HTTP proxy URL for all HTTP clients
    pub proxy: Option<String>,
    pub bootstrap_timeout: Duration,
    pub resolve_timeout: Duration,
    pub audio_stream_timeout: Duration,
    pub video_stream_timeout: Duration,
    pub extractor_timeout: Duration,
    pub archive_poll_interval: Duration,
    pub archive_poll_ceiling: Duration,
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            cookies_dir: PathBuf::from("cookies"),
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            api_url: None,
            ytdlp_path: None,
            proxy: None,
            bootstrap_timeout: Duration::from_secs(30),
            resolve_timeout: Duration::from_secs(60),
            audio_stream_timeout: Duration::from_secs(300),
            video_stream_timeout: Duration::from_secs(600),
            extractor_timeout: Duration::from_secs(120),
            archive_poll_interval: Duration::from_millis(500),
            archive_poll_ceiling: Duration::from_secs(60),
            chunk_size: 16 * 1024,
        }
    }
}

impl Settings {
    /// Defaults overridden by `YTR_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = non_empty("YTR_DOWNLOAD_DIR") {
            settings.download_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("YTR_COOKIES_DIR") {
            settings.cookies_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty("YTR_BOOTSTRAP_URL") {
            settings.bootstrap_url = url;
        }
        settings.api_url = non_empty("YTR_API_URL");
        settings.ytdlp_path = non_empty("YTR_YTDLP");
        settings.proxy = non_empty("YTR_PROXY");
        settings
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_cookies_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cookies_dir = dir.into();
        self
    }

    pub fn with_bootstrap_url(mut self, url: impl Into<String>) -> Self {
        self.bootstrap_url = url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_archive_polling(mut self, interval: Duration, ceiling: Duration) -> Self {
        self.archive_poll_interval = interval;
        self.archive_poll_ceiling = ceiling;
        self
    }

    /// Stream timeout for the given kind; video files are larger
    pub fn stream_timeout(&self, kind: super::models::MediaKind) -> Duration {
        match kind {
            super::models::MediaKind::Audio => self.audio_stream_timeout,
            super::models::MediaKind::Video => self.video_stream_timeout,
        }
    }

    /// HTTP client honoring the configured proxy
    pub fn http_client(&self) -> Result<reqwest::Client, super::errors::DownloadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_url) = self.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                super::errors::DownloadError::InvalidInput(format!("proxy {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }
        Ok(builder.build()?)
    }
}
