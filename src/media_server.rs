use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Media-server collaborator: answers whether a film already exists in the
/// personal library.
#[async_trait]
pub trait MediaServerService: Send + Sync {
    async fn is_locally_available(&self, title: &str, year: i32) -> Result<bool>;
}

/// Library entries whose year is within this window of the release year
/// still count as a match; the server's year metadata is often off by a
/// regional-release margin.
const YEAR_PADDING: i32 = 2;

/// Plex media-server client.
pub struct PlexMediaServer {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

#[derive(Debug, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<LibraryEntry>,
}

#[derive(Debug, Deserialize)]
struct LibraryEntry {
    title: Option<String>,
    year: Option<i32>,
}

impl PlexMediaServer {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl MediaServerService for PlexMediaServer {
    async fn is_locally_available(&self, title: &str, year: i32) -> Result<bool> {
        let url = format!(
            "{}/search?query={}",
            self.base_url,
            urlencoding::encode(title)
        );
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("media server search failed: {}", response.status()));
        }

        let results: SearchResponse = response.json().await?;
        let earliest = year - YEAR_PADDING;
        let latest = year + YEAR_PADDING;

        for entry in &results.media_container.metadata {
            let entry_year = entry.year.unwrap_or_default();
            if entry.title.as_deref() == Some(title)
                && entry_year >= earliest
                && entry_year <= latest
            {
                debug!("{:?} ({}) found in the local library", title, entry_year);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
