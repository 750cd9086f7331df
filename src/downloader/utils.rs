// Helper functions shared by the pipeline components

use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use super::errors::DownloadError;

pub const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";
pub const PLAYLIST_BASE: &str = "https://youtube.com/playlist?list=";

/// Shortest media id the remote API accepts
pub const MIN_MEDIA_ID_LEN: usize = 3;

lazy_static::lazy_static! {
    static ref YOUTUBE_RE: Regex = Regex::new(r"(?:youtube\.com|youtu\.be)").unwrap();
    static ref MEDIA_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Drop tracking parameters: everything from the first `&` onward
pub fn normalize_link(link: &str) -> &str {
    match link.find('&') {
        Some(idx) => &link[..idx],
        None => link,
    }
}

/// Id segment of a watch link (after the last `v=`, up to `&`) or a
/// `youtu.be/<id>` short link, else the input itself
pub fn extract_media_id(link: &str) -> &str {
    if let Some(idx) = link.rfind("v=") {
        let rest = &link[idx + 2..];
        return rest.split('&').next().unwrap_or(rest);
    }
    if let Some(idx) = link.find("youtu.be/") {
        let rest = &link[idx + "youtu.be/".len()..];
        return rest.split(['?', '&', '/', '#']).next().unwrap_or(rest);
    }
    link
}

/// Validated media id for the acquisition path; it names a file in the
/// cache directory, so only `[A-Za-z0-9_-]` is accepted
pub fn media_id_of(link: &str) -> Result<&str, DownloadError> {
    let id = extract_media_id(link);
    if id.chars().count() < MIN_MEDIA_ID_LEN {
        return Err(DownloadError::InvalidInput(format!(
            "media id '{}' is shorter than {} characters",
            id, MIN_MEDIA_ID_LEN
        )));
    }
    if !MEDIA_ID_RE.is_match(id) {
        return Err(DownloadError::InvalidInput(format!("media id '{}' has unsupported characters", id)));
    }
    Ok(id)
}

pub fn is_youtube_link(link: &str) -> bool {
    YOUTUBE_RE.is_match(link)
}

/// Thumbnail URLs carry volatile signing parameters
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// "3:45" / "1:02:03" to seconds; None on a non-numeric segment, more than
/// three segments, or overflow
pub fn time_to_seconds(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    parts.iter().rev().enumerate().try_fold(0u64, |acc, (i, part)| {
        let value: u64 = part.trim().parse().ok()?;
        let unit = 60u64.checked_pow(i as u32)?;
        acc.checked_add(value.checked_mul(unit)?)
    })
}

/// Seconds to the "m:ss" / "h:mm:ss" display form
pub fn format_duration(total: u64) -> String {
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Locate the yt-dlp binary, falling back to PATH lookup at spawn time
pub fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    "yt-dlp".to_string()
}

/// Run command with timeout, capturing both pipes
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    limit: Duration,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ExtractionToolFailure(format!("failed to start {}: {}", program, e)))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExtractionToolFailure(format!("failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExtractionToolFailure(format!("failed to capture stderr from {}", program))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(limit, child.wait()).await {
        Ok(status_res) => {
            let status = status_res?;
            let stdout = join_pipe(stdout_task).await?;
            let stderr = join_pipe(stderr_task).await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::TransportTimeout(format!(
                "{} did not finish within {}s",
                program,
                limit.as_secs()
            )))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExtractionToolFailure(format!("pipe reader failed: {}", e)))?
        .map_err(DownloadError::from)
}
