pub mod downloader;
pub mod youtube;

pub use downloader::{
    ChatMessage, Delivery, DownloadError, DownloadIntent, MediaKind, MessagingClient, Settings, UnconfiguredArchive,
};
pub use youtube::YouTube;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
