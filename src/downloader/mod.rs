// Downloader module - resolution and fetch pipeline behind the facade

pub mod archive;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod extractors;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod utils;

pub use archive::{ArchiveFetcher, ArchivedMessage, MessagingClient, UnconfiguredArchive};
pub use config::Settings;
pub use credentials::{CookiePool, CredentialToken};
pub use errors::DownloadError;
pub use extractors::{ExtractionBridge, ExtractionTool, ExtractorConfig, YtDlpCli};
pub use metadata::{MetadataResolver, SearchHit, SearchService, YtDlpSearch};
pub use models::{
    ArchiveLocator, ChannelRef, ChatMessage, Delivery, DownloadIntent, EntityKind, FormatDescriptor, MediaKind,
    MessageEntity, RemoteResolution, SliderEntry, Track, VideoDetails,
};
pub use orchestrator::MediaAcquirer;
pub use resolver::{ResolverAddress, ResolverClient};
