// Extraction-tool bridge: playlist, format and size queries the remote API
// does not serve. Every failure degrades to an empty/unavailable result.

mod cli;
mod traits;

use std::sync::Arc;

pub use cli::YtDlpCli;
pub use traits::{ExtractionTool, ExtractorConfig, FormatEntry, ToolOutput};

use super::credentials::CookiePool;
use super::errors::DownloadError;
use super::models::FormatDescriptor;

/// Stderr marker that does not invalidate a playlist listing
const HIDDEN_UNAVAILABLE: &str = "unavailable videos are hidden";

pub struct ExtractionBridge {
    tool: Arc<dyn ExtractionTool>,
    cookies: CookiePool,
}

impl ExtractionBridge {
    pub fn new(tool: Arc<dyn ExtractionTool>, cookies: CookiePool) -> Self {
        Self { tool, cookies }
    }

    /// Sum of the declared or approximate size of every format
    pub async fn estimate_size(&self, link: &str) -> Result<u64, DownloadError> {
        let cookies = self.cookies.pick().await?;
        let info = self.tool.dump_info(link, &cookies).await?;
        let formats = format_entries(&info);
        if formats.is_empty() {
            return Err(DownloadError::EmptyResult(format!("no formats for {}", link)));
        }
        Ok(total_size(&formats))
    }

    /// Ids of up to `limit` playlist entries; empty when anything goes wrong
    pub async fn list_playlist_ids(&self, link: &str, limit: usize) -> Vec<String> {
        let Some(cookies) = self.cookies.pick_optional().await else {
            return Vec::new();
        };
        match self.tool.playlist(link, limit, &cookies).await {
            Ok(output) => playlist_ids(&output),
            Err(e) => {
                tracing::warn!(tool = self.tool.name(), link, error = %e, "playlist listing failed");
                Vec::new()
            }
        }
    }

    /// Downloadable formats, without adaptive-only (DASH) entries
    pub async fn list_formats(&self, link: &str) -> Vec<FormatDescriptor> {
        let Some(cookies) = self.cookies.pick_optional().await else {
            return Vec::new();
        };
        match self.tool.dump_info(link, &cookies).await {
            Ok(info) => describe_formats(&format_entries(&info), link),
            Err(e) => {
                tracing::warn!(tool = self.tool.name(), link, error = %e, "format listing failed");
                Vec::new()
            }
        }
    }
}

/// Entries of the `formats` array; malformed entries are skipped
pub fn format_entries(info: &serde_json::Value) -> Vec<FormatEntry> {
    info["formats"]
        .as_array()
        .map(|formats| {
            formats
                .iter()
                .filter_map(|f| serde_json::from_value(f.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn total_size(formats: &[FormatEntry]) -> u64 {
    formats.iter().filter_map(FormatEntry::effective_size).sum()
}

pub fn describe_formats(formats: &[FormatEntry], link: &str) -> Vec<FormatDescriptor> {
    formats
        .iter()
        .filter(|f| !f.is_dash())
        .map(|f| FormatDescriptor {
            format: f.format.clone().unwrap_or_default(),
            filesize: f.filesize.map(|s| s as u64),
            format_id: f.format_id.clone().unwrap_or_default(),
            ext: f.ext.clone().unwrap_or_default(),
            format_note: f.format_note.clone(),
            yturl: link.to_string(),
        })
        .collect()
}

/// Non-empty stdout lines, unless the run failed for a real reason
pub fn playlist_ids(output: &ToolOutput) -> Vec<String> {
    let tolerated = output.stderr.to_lowercase().contains(HIDDEN_UNAVAILABLE);
    if !output.success && !tolerated {
        tracing::warn!(stderr = %output.stderr.lines().next().unwrap_or(""), "extractor rejected playlist");
        return Vec::new();
    }
    output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
