#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use youtube_resolver::downloader::{
    ArchiveFetcher, ArchiveLocator, ArchivedMessage, DownloadError, MediaAcquirer, MessagingClient, ResolverClient,
    Settings,
};

/// Bootstrap, remote API and stream endpoints on one local server
pub struct MockApi {
    pub base: String,
    pub bootstrap_hits: AtomicUsize,
    pub download_hits: AtomicUsize,
    pub file_hits: AtomicUsize,
    pub bootstrap_status: Mutex<StatusCode>,
    pub responses: Mutex<HashMap<String, serde_json::Value>>,
    pub payload: Vec<u8>,
}

impl MockApi {
    pub fn total_hits(&self) -> usize {
        self.bootstrap_hits.load(Ordering::SeqCst)
            + self.download_hits.load(Ordering::SeqCst)
            + self.file_hits.load(Ordering::SeqCst)
    }

    pub fn respond(&self, media_id: &str, body: serde_json::Value) {
        self.responses.lock().unwrap().insert(media_id.to_string(), body);
    }

    pub fn stream_url(&self) -> String {
        format!("{}/file", self.base)
    }

    pub fn bootstrap_url(&self) -> String {
        format!("{}/bootstrap", self.base)
    }
}

async fn bootstrap(State(api): State<Arc<MockApi>>) -> Response {
    api.bootstrap_hits.fetch_add(1, Ordering::SeqCst);
    let status = *api.bootstrap_status.lock().unwrap();
    (status, format!("  {}\n", api.base)).into_response()
}

async fn download(State(api): State<Arc<MockApi>>, Query(params): Query<HashMap<String, String>>) -> Response {
    api.download_hits.fetch_add(1, Ordering::SeqCst);
    let id = params.get("url").cloned().unwrap_or_default();
    let found = api.responses.lock().unwrap().get(&id).cloned();
    match found {
        Some(body) => Json(body).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "unknown id").into_response(),
    }
}

async fn file(State(api): State<Arc<MockApi>>) -> Response {
    api.file_hits.fetch_add(1, Ordering::SeqCst);
    // slow enough for concurrent callers to overlap
    tokio::time::sleep(Duration::from_millis(50)).await;
    api.payload.clone().into_response()
}

async fn gone() -> Response {
    (StatusCode::NOT_FOUND, "gone").into_response()
}

pub async fn spawn_api(payload_len: usize) -> Arc<MockApi> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let api = Arc::new(MockApi {
        base: format!("http://{}", addr),
        bootstrap_hits: AtomicUsize::new(0),
        download_hits: AtomicUsize::new(0),
        file_hits: AtomicUsize::new(0),
        bootstrap_status: Mutex::new(StatusCode::OK),
        responses: Mutex::new(HashMap::new()),
        payload: (0..payload_len).map(|i| (i % 251) as u8).collect(),
    });

    let app = Router::new()
        .route("/bootstrap", get(bootstrap))
        .route("/download", get(download))
        .route("/file", get(file))
        .route("/gone", get(gone))
        .with_state(api.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    api
}

/// Archive client whose transfers land after `delay`, or never
pub struct MockArchive {
    pub known: Option<ArchiveLocator>,
    pub delay: Option<Duration>,
    pub lookups: AtomicUsize,
}

impl MockArchive {
    pub fn new(known: Option<ArchiveLocator>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            known,
            delay,
            lookups: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MessagingClient for MockArchive {
    async fn get_message(&self, locator: &ArchiveLocator) -> Result<Option<ArchivedMessage>, DownloadError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .known
            .as_ref()
            .filter(|known| *known == locator)
            .map(|known| ArchivedMessage {
                locator: known.clone(),
                file_name: Some("song.webm".to_string()),
            }))
    }

    async fn download_media(&self, _message: &ArchivedMessage, target: &Path) -> Result<(), DownloadError> {
        if let Some(delay) = self.delay {
            let target = target.to_path_buf();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // land the file atomically so the poller never sees it half written
                let staging = target.with_extension("staging");
                tokio::fs::write(&staging, b"archived bytes").await.unwrap();
                tokio::fs::rename(staging, target).await.unwrap();
            });
        }
        Ok(())
    }
}

pub fn settings_for(api: &MockApi, dir: &Path) -> Settings {
    Settings::default()
        .with_download_dir(dir)
        .with_cookies_dir(dir.join("cookies"))
        .with_bootstrap_url(api.bootstrap_url())
        .with_archive_polling(Duration::from_millis(20), Duration::from_secs(5))
}

pub fn acquirer(settings: Settings, archive: Arc<dyn MessagingClient>) -> (MediaAcquirer, Arc<ResolverClient>) {
    let resolver = Arc::new(ResolverClient::new(&settings, reqwest::Client::new()));
    let fetcher = ArchiveFetcher::new(
        archive,
        settings.download_dir.clone(),
        settings.archive_poll_interval,
        settings.archive_poll_ceiling,
    );
    (MediaAcquirer::new(settings, resolver.clone(), fetcher), resolver)
}
