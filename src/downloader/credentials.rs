// Rotating cookie-file pool for extractor invocations

use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::errors::DownloadError;

const AUDIT_LOG: &str = "logs.csv";

/// Opaque handle to a credential file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialToken(PathBuf);

impl CredentialToken {
    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn as_arg(&self) -> String {
        self.0.to_string_lossy().to_string()
    }
}

impl From<PathBuf> for CredentialToken {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

/// Hands out a random `*.txt` cookie file per request
#[derive(Debug, Clone)]
pub struct CookiePool {
    dir: PathBuf,
}

impl CookiePool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick a credential and record the choice in the audit log.
    ///
    /// The pool is re-listed on every call so files dropped in at runtime
    /// are picked up. An empty pool is `CredentialsUnavailable`.
    pub async fn pick(&self) -> Result<CredentialToken, DownloadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let candidates = self.list().await?;
        let chosen = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| DownloadError::CredentialsUnavailable(self.dir.display().to_string()))?;

        if let Err(e) = self.record(&chosen).await {
            tracing::warn!(error = %e, "could not append to credential audit log");
        }
        tracing::debug!(cookie = %chosen.display(), "credential chosen");
        Ok(CredentialToken(chosen))
    }

    /// Like `pick`, but an empty pool degrades to `None`
    pub async fn pick_optional(&self) -> Option<CredentialToken> {
        match self.pick().await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(error = %e, "no credential for extractor");
                None
            }
        }
    }

    async fn list(&self) -> Result<Vec<PathBuf>, DownloadError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "txt") && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn record(&self, chosen: &Path) -> std::io::Result<()> {
        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(AUDIT_LOG))
            .await?;
        log.write_all(format!("Chosen File: {}\n", chosen.display()).as_bytes())
            .await?;
        log.flush().await
    }
}
