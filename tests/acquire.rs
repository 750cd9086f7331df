mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{acquirer, settings_for, spawn_api, MockArchive};
use youtube_resolver::downloader::{ArchiveLocator, ChannelRef, DownloadError, MediaKind, UnconfiguredArchive};

#[tokio::test]
async fn test_stream_download_writes_exact_bytes() {
    let api = spawn_api(100_000).await;
    api.respond("dQw4w9WgXcQ", json!({"status": "success", "stream_url": api.stream_url()}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let path = acquirer
        .acquire("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=RD", MediaKind::Audio)
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("dQw4w9WgXcQ.webm"));
    assert_eq!(std::fs::read(&path).unwrap(), api.payload);
    assert!(!dir.path().join("dQw4w9WgXcQ.webm.part").exists());
    assert_eq!(api.bootstrap_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_acquire_is_a_cache_hit() {
    let api = spawn_api(4096).await;
    api.respond("cachedVideo", json!({"status": "success", "stream_url": api.stream_url()}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let first = acquirer.acquire("cachedVideo", MediaKind::Video).await.unwrap();
    let hits_after_first = api.total_hits();
    let second = acquirer.acquire("cachedVideo", MediaKind::Video).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.extension().unwrap(), "mkv");
    assert_eq!(api.total_hits(), hits_after_first);
}

#[tokio::test]
async fn test_short_id_makes_no_network_call() {
    let api = spawn_api(16).await;
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    for link in ["ab", "", "https://www.youtube.com/watch?v=x1"] {
        let result = acquirer.acquire(link, MediaKind::Audio).await;
        assert!(matches!(result, Err(DownloadError::InvalidInput(_))), "{}", link);
    }
    assert_eq!(api.total_hits(), 0);
}

#[tokio::test]
async fn test_ids_cannot_leave_the_cache_dir() {
    let api = spawn_api(16).await;
    api.respond("../escaped", json!({"status": "success", "stream_url": api.stream_url()}));
    let root = tempfile::tempdir().unwrap();
    let cache = root.path().join("downloads");
    let (acquirer, _) = acquirer(settings_for(&api, &cache), Arc::new(UnconfiguredArchive));

    for link in [
        "https://www.youtube.com/watch?v=../escaped",
        "https://www.youtube.com/watch?v=..%2Fescaped",
        "https://www.youtube.com/watch?v=sub/dir",
    ] {
        let result = acquirer.acquire(link, MediaKind::Audio).await;
        assert!(matches!(result, Err(DownloadError::InvalidInput(_))), "{}", link);
    }
    assert!(!root.path().join("escaped.webm").exists());
    assert_eq!(api.total_hits(), 0);
}

#[tokio::test]
async fn test_short_links_resolve_to_their_id() {
    let api = spawn_api(512).await;
    api.respond("dQw4w9WgXcQ", json!({"status": "success", "stream_url": api.stream_url()}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let path = acquirer
        .acquire("https://youtu.be/dQw4w9WgXcQ?si=tracking", MediaKind::Audio)
        .await
        .unwrap();
    assert_eq!(path, dir.path().join("dQw4w9WgXcQ.webm"));
    assert_eq!(std::fs::read(&path).unwrap().len(), 512);
}

#[tokio::test]
async fn test_archive_redirect_materializes_file() {
    let api = spawn_api(16).await;
    api.respond("archivedOne", json!({"link": "https://t.me/chan/42"}));
    let archive = MockArchive::new(
        Some(ArchiveLocator {
            channel: ChannelRef::Public("chan".to_string()),
            message_id: 42,
        }),
        Some(Duration::from_millis(200)),
    );
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), archive.clone());

    let path = acquirer.acquire("archivedOne", MediaKind::Audio).await.unwrap();

    assert_eq!(path, dir.path().join("archivedOne.webm"));
    assert_eq!(std::fs::read(&path).unwrap(), b"archived bytes");
    assert_eq!(archive.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(api.file_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_archive_materialization_timeout_is_bounded() {
    let api = spawn_api(16).await;
    api.respond("neverLands", json!({"link": "https://t.me/c/1234567/9"}));
    let archive = MockArchive::new(
        Some(ArchiveLocator {
            channel: ChannelRef::Internal("1234567".to_string()),
            message_id: 9,
        }),
        None,
    );
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(&api, dir.path())
        .with_archive_polling(Duration::from_millis(25), Duration::from_millis(300));
    let (acquirer, _) = acquirer(settings, archive);

    let started = Instant::now();
    let result = acquirer.acquire("neverLands", MediaKind::Video).await;

    assert!(matches!(result, Err(DownloadError::ArchiveNotFound(_))));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_archive_message_is_not_found() {
    let api = spawn_api(16).await;
    api.respond("missingMsg", json!({"link": "https://t.me/chan/7"}));
    let archive = MockArchive::new(None, Some(Duration::from_millis(10)));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), archive.clone());

    let result = acquirer.acquire("missingMsg", MediaKind::Audio).await;
    assert!(matches!(result, Err(DownloadError::ArchiveNotFound(_))));
    assert_eq!(archive.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bootstrap_failure_is_resolver_unavailable() {
    let api = spawn_api(16).await;
    *api.bootstrap_status.lock().unwrap() = StatusCode::SERVICE_UNAVAILABLE;
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, resolver) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let result = acquirer.acquire("someVideo", MediaKind::Audio).await;
    assert!(matches!(result, Err(DownloadError::ResolverUnavailable(_))));
    assert!(resolver.address().current().await.is_none());
    assert_eq!(api.download_hits.load(Ordering::SeqCst), 0);

    // the address is fetched again on the next request once the paste is back
    *api.bootstrap_status.lock().unwrap() = StatusCode::OK;
    api.respond("someVideo", json!({"status": "success", "stream_url": api.stream_url()}));
    assert!(acquirer.acquire("someVideo", MediaKind::Audio).await.is_ok());
    assert_eq!(resolver.address().current().await.as_deref(), Some(api.base.as_str()));
}

#[tokio::test]
async fn test_upstream_errors_leave_no_artifact() {
    let api = spawn_api(16).await;
    api.respond("badStream", json!({"status": "success", "stream_url": format!("{}/gone", api.base)}));
    api.respond("badBody", json!({"status": "failed"}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let stream = acquirer.acquire("badStream", MediaKind::Audio).await;
    assert!(matches!(stream, Err(DownloadError::UpstreamFailure(ref m)) if m.contains("badStream")));
    assert!(!dir.path().join("badStream.webm").exists());
    assert!(!dir.path().join("badStream.webm.part").exists());

    let body = acquirer.acquire("badBody", MediaKind::Audio).await;
    assert!(matches!(body, Err(DownloadError::UpstreamFailure(ref m)) if m.contains("invalid response")));

    // unknown ids make the mock API answer 500
    let status = acquirer.acquire("unknownId", MediaKind::Audio).await;
    assert!(matches!(status, Err(DownloadError::UpstreamFailure(ref m)) if m.contains("500")));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let api = spawn_api(32_768).await;
    api.respond("popularOne", json!({"status": "success", "stream_url": api.stream_url()}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));
    let acquirer = Arc::new(acquirer);

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let acquirer = acquirer.clone();
            tokio::spawn(async move { acquirer.acquire("popularOne", MediaKind::Audio).await })
        })
        .collect();

    for task in tasks {
        let path = task.await.unwrap().unwrap();
        assert_eq!(std::fs::read(path).unwrap().len(), 32_768);
    }
    assert_eq!(api.download_hits.load(Ordering::SeqCst), 1);
    assert_eq!(api.file_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_audio_and_video_are_separate_artifacts() {
    let api = spawn_api(64).await;
    api.respond("bothKinds", json!({"status": "success", "stream_url": api.stream_url()}));
    let dir = tempfile::tempdir().unwrap();
    let (acquirer, _) = acquirer(settings_for(&api, dir.path()), Arc::new(UnconfiguredArchive));

    let audio = acquirer.acquire("bothKinds", MediaKind::Audio).await.unwrap();
    let video = acquirer.acquire("bothKinds", MediaKind::Video).await.unwrap();

    assert_ne!(audio, video);
    assert_eq!(api.file_hits.load(Ordering::SeqCst), 2);
}
