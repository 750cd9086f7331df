// ExtractionTool trait and the extractor's JSON shapes

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::downloader::credentials::CredentialToken;
use crate::downloader::errors::DownloadError;

/// Configuration for extractor invocations
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Hard bound on one invocation
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ExtractorConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One entry of the `formats` array in `-J` output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatEntry {
    pub format: Option<String>,
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub format_note: Option<String>,
    /// Exact size in bytes; the extractor sometimes emits floats
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
}

impl FormatEntry {
    /// Exact size when known, otherwise the approximation
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize
            .filter(|s| *s > 0.0)
            .or(self.filesize_approx.filter(|s| *s > 0.0))
            .map(|s| s as u64)
    }

    /// Adaptive-only streams are labelled "DASH ..." by the extractor
    pub fn is_dash(&self) -> bool {
        self.format
            .as_deref()
            .map_or(false, |f| f.to_lowercase().contains("dash"))
    }
}

/// Raw output of an extractor run that exited
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// External media extractor
#[async_trait]
pub trait ExtractionTool: Send + Sync {
    /// Name of the tool (for logging)
    fn name(&self) -> &'static str;

    /// Metadata-only dump (`-J`) of a link
    async fn dump_info(&self, link: &str, cookies: &CredentialToken) -> Result<serde_json::Value, DownloadError>;

    /// Flat, id-only playlist listing, bounded to `limit` entries
    async fn playlist(&self, link: &str, limit: usize, cookies: &CredentialToken) -> Result<ToolOutput, DownloadError>;
}
