// Metadata resolver: title/duration/thumbnail/id lookups via a search service

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::DownloadError;
use super::extractors::YtDlpCli;
use super::models::{SliderEntry, Track, VideoDetails};
use super::utils::{format_duration, normalize_link, strip_query, time_to_seconds, WATCH_BASE};

/// Page size of the positional slider lookup
pub const SLIDER_PAGE: usize = 10;

/// One result from the search service
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    /// Display duration, absent for live content
    pub duration: Option<String>,
    pub thumbnails: Vec<String>,
    pub link: String,
}

/// Search backend answering free-text or link queries
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DownloadError>;
}

/// Search backed by the extractor's `ytsearchN:` pseudo-URL
pub struct YtDlpSearch {
    cli: Arc<YtDlpCli>,
}

impl YtDlpSearch {
    pub fn new(cli: Arc<YtDlpCli>) -> Self {
        Self { cli }
    }
}

#[async_trait]
impl SearchService for YtDlpSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DownloadError> {
        let entries = self.cli.search(query, limit).await?;
        Ok(entries.iter().filter_map(hit_from_json).collect())
    }
}

/// Map one flat-playlist search entry; entries without an id are dropped
pub fn hit_from_json(entry: &serde_json::Value) -> Option<SearchHit> {
    let id = entry["id"].as_str()?.to_string();

    let duration = entry["duration_string"]
        .as_str()
        .map(str::to_string)
        .or_else(|| entry["duration"].as_f64().map(|secs| format_duration(secs as u64)));

    let mut thumbnails: Vec<String> = entry["thumbnails"]
        .as_array()
        .map(|thumbs| {
            thumbs
                .iter()
                .filter_map(|t| t["url"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(single) = entry["thumbnail"].as_str() {
        thumbnails.insert(0, single.to_string());
    }

    let link = entry["webpage_url"]
        .as_str()
        .or_else(|| entry["url"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", WATCH_BASE, id));

    Some(SearchHit {
        title: entry["title"].as_str().unwrap_or("Unknown").to_string(),
        id,
        duration,
        thumbnails,
        link,
    })
}

pub struct MetadataResolver {
    search: Arc<dyn SearchService>,
}

impl MetadataResolver {
    pub fn new(search: Arc<dyn SearchService>) -> Self {
        Self { search }
    }

    /// Run a search; an empty query or empty result is `EmptyResult`
    pub async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<VideoDetails>, DownloadError> {
        Ok(self.hits(query, limit).await?.iter().map(details_of).collect())
    }

    pub async fn details(&self, link: &str) -> Result<VideoDetails, DownloadError> {
        self.first(link).await.map(|hit| details_of(&hit))
    }

    pub async fn title(&self, link: &str) -> Result<String, DownloadError> {
        self.first(link).await.map(|hit| hit.title)
    }

    /// Display duration; None for live content
    pub async fn duration(&self, link: &str) -> Result<Option<String>, DownloadError> {
        self.first(link).await.map(|hit| hit.duration)
    }

    pub async fn thumbnail(&self, link: &str) -> Result<String, DownloadError> {
        self.first(link).await.map(|hit| first_thumbnail(&hit))
    }

    pub async fn track(&self, link: &str) -> Result<Track, DownloadError> {
        let hit = self.first(link).await?;
        Ok(Track {
            thumb: first_thumbnail(&hit),
            title: hit.title,
            link: hit.link,
            vidid: hit.id,
            duration_min: hit.duration,
        })
    }

    /// The `index`-th (0-based) hit of a ten-result page
    pub async fn slider(&self, link: &str, index: usize) -> Result<SliderEntry, DownloadError> {
        let hits = self.hits(link, SLIDER_PAGE).await?;
        let total = hits.len();
        let hit = hits.into_iter().nth(index).ok_or_else(|| {
            DownloadError::EmptyResult(format!("no result at position {} ({} found)", index, total))
        })?;
        Ok(SliderEntry {
            thumbnail: first_thumbnail(&hit),
            title: hit.title,
            duration_min: hit.duration,
            vidid: hit.id,
        })
    }

    async fn first(&self, link: &str) -> Result<SearchHit, DownloadError> {
        self.hits(link, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DownloadError::EmptyResult(link.to_string()))
    }

    async fn hits(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DownloadError> {
        let query = normalize_link(query.trim());
        if query.is_empty() {
            return Err(DownloadError::EmptyResult("empty query".to_string()));
        }
        let hits = self.search.search(query, limit).await?;
        if hits.is_empty() {
            tracing::info!(query, "search returned no results");
            return Err(DownloadError::EmptyResult(query.to_string()));
        }
        Ok(hits)
    }
}

fn first_thumbnail(hit: &SearchHit) -> String {
    hit.thumbnails
        .first()
        .map(|t| strip_query(t).to_string())
        .unwrap_or_default()
}

fn details_of(hit: &SearchHit) -> VideoDetails {
    let duration_seconds = hit
        .duration
        .as_deref()
        .and_then(time_to_seconds)
        .unwrap_or(0);
    VideoDetails {
        title: hit.title.clone(),
        duration_text: hit.duration.clone(),
        duration_seconds,
        thumbnail: first_thumbnail(hit),
        id: hit.id.clone(),
    }
}
