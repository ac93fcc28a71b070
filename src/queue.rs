use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A named download-quality policy understood by the queue.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QualityProfile {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

/// Request to add one film to the download queue.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieRequest {
    pub title: String,
    pub year: i32,
    pub tmdb_id: i64,
    pub quality_profile_id: i64,
    pub root_folder_path: String,
    pub monitored: bool,
    pub tags: Vec<i64>,
    pub add_options: AddMovieOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieOptions {
    pub search_for_movie: bool,
}

/// Download-queue collaborator.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>>;

    /// `Ok(None)` when no profile carries that name.
    async fn quality_profile_by_name(&self, name: &str) -> Result<Option<QualityProfile>> {
        Ok(self
            .quality_profiles()
            .await?
            .into_iter()
            .find(|profile| profile.name == name))
    }

    /// Look up a tag by label, creating it on first use.
    async fn get_or_create_tag(&self, label: &str) -> Result<i64>;

    /// True when the queue already has an entry for this metadata ID.
    async fn has_entry_for(&self, tmdb_id: i64) -> Result<bool>;

    async fn submit(&self, request: &AddMovieRequest) -> Result<()>;
}

/// Radarr v3 API client.
pub struct RadarrQueue {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QueuedMovie {
    #[allow(dead_code)]
    id: i64,
}

impl RadarrQueue {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("queue API error {}: {}", status, text));
        }

        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("queue API error {}: {}", status, text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl QueueService for RadarrQueue {
    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>> {
        self.get_json("/qualityprofile").await
    }

    async fn get_or_create_tag(&self, label: &str) -> Result<i64> {
        let tags: Vec<Tag> = self.get_json("/tag").await?;
        if let Some(tag) = tags.iter().find(|tag| tag.label == label) {
            return Ok(tag.id);
        }

        debug!("Creating queue tag {:?}", label);
        let created: Tag = self
            .post_json("/tag", &serde_json::json!({ "label": label }))
            .await?;
        Ok(created.id)
    }

    async fn has_entry_for(&self, tmdb_id: i64) -> Result<bool> {
        let entries: Vec<QueuedMovie> =
            self.get_json(&format!("/movie?tmdbId={}", tmdb_id)).await?;
        Ok(!entries.is_empty())
    }

    async fn submit(&self, request: &AddMovieRequest) -> Result<()> {
        let _created: serde_json::Value = self.post_json("/movie", request).await?;
        Ok(())
    }
}
