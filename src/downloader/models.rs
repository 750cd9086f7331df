// Common data models for the resolution pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::errors::DownloadError;

/// Kind of artifact requested from the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Container extension of the cached artifact
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio => "webm",
            Self::Video => "mkv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local cache location of an artifact, keyed by media id and kind
pub fn artifact_path(download_dir: &Path, media_id: &str, kind: MediaKind) -> PathBuf {
    download_dir.join(format!("{}.{}", media_id, kind.extension()))
}

/// Channel part of an archive link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelRef {
    /// Public handle, e.g. `t.me/<handle>/42`
    Public(String),
    /// Internal numeric channel, e.g. `t.me/c/<id>/42`
    Internal(String),
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public(handle) => write!(f, "{}", handle),
            Self::Internal(id) => write!(f, "c/{}", id),
        }
    }
}

/// A message in the archive channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLocator {
    pub channel: ChannelRef,
    pub message_id: i64,
}

impl fmt::Display for ArchiveLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message_id)
    }
}

/// Outcome of asking the remote API about a media id
#[derive(Debug)]
pub enum RemoteResolution {
    /// The file was already uploaded to the archive channel
    ArchiveRedirect(String),
    /// Bytes can be streamed from this URL
    StreamLocation(String),
    Failure(DownloadError),
}

/// JSON body of `GET {base}/download`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    pub link: Option<String>,
    pub status: Option<String>,
    pub stream_url: Option<String>,
}

/// Video information from a search lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub title: String,
    /// Duration as displayed, e.g. "3:45"; None for live content
    pub duration_text: Option<String>,
    pub duration_seconds: u64,
    pub thumbnail: String,
    pub id: String,
}

/// Track record handed to the player queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub link: String,
    pub vidid: String,
    pub duration_min: Option<String>,
    pub thumb: String,
}

/// One entry of a positional search page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderEntry {
    pub title: String,
    pub duration_min: Option<String>,
    pub thumbnail: String,
    pub vidid: String,
}

/// Downloadable format reported by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Human label, e.g. "251 - audio only (medium)"
    pub format: String,
    pub filesize: Option<u64>,
    pub format_id: String,
    pub ext: String,
    pub format_note: Option<String>,
    /// Link the format was listed for
    pub yturl: String,
}

/// What the caller wants downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadIntent {
    /// Plain playback; audio
    Default,
    Video,
    SongAudio,
    SongVideo,
}

impl DownloadIntent {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video => MediaKind::Video,
            // song requests are always served as audio, whatever the source
            Self::Default | Self::SongAudio | Self::SongVideo => MediaKind::Audio,
        }
    }
}

/// Result of a download as surfaced to the chat front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    pub path: Option<PathBuf>,
    /// File path on success, failure reason otherwise
    pub message: String,
}

impl Delivery {
    pub fn ok(path: PathBuf) -> Self {
        Self {
            success: true,
            message: path.display().to_string(),
            path: Some(path),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            path: None,
            message: reason.into(),
        }
    }
}

/// Kind of a message entity, as chat platforms report them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// Bare URL written in the text
    Url,
    /// Text with a hidden hyperlink
    TextLink(String),
    Other,
}

/// Entity span; offset and length count UTF-16 code units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

/// The parts of a chat message needed to find a link in it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: Option<String>,
    pub caption: Option<String>,
    pub entities: Vec<MessageEntity>,
    pub caption_entities: Vec<MessageEntity>,
    pub reply_to: Option<Box<ChatMessage>>,
}
