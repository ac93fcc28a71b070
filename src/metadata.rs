use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Everything the filter engine needs to know about one film, keyed by the
/// metadata service's numeric ID.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub original_language: String,
    pub release_year: Option<i32>,
    pub runtime_mins: u32,
    pub budget: u64,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
}

/// Metadata collaborator.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Resolve an IMDB identifier. `Ok(None)` means the service knows
    /// nothing about the film — a normal, non-fatal outcome.
    async fn lookup_by_imdb(&self, imdb_id: &str) -> Result<Option<MovieDetails>>;

    /// Names of the flatrate streaming services currently carrying the film.
    async fn streaming_sources(&self, id: i64) -> Result<Vec<String>>;
}

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB v3 API client.
pub struct TmdbMetadata {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    region: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<FindMovie>,
}

#[derive(Debug, Deserialize)]
struct FindMovie {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: i64,
    title: String,
    original_language: String,
    release_date: Option<String>,
    runtime: Option<u32>,
    budget: Option<u64>,
    #[serde(default)]
    genres: Vec<Genre>,
    credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Credits {
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    #[serde(default)]
    flatrate: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct Provider {
    provider_name: String,
}

impl TmdbMetadata {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        region: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            region: region.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("metadata API error {}: {}", status, text));
        }

        Ok(response.json().await?)
    }

    fn release_year(release_date: Option<&str>) -> Option<i32> {
        let date = release_date?;
        if date.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(parsed) => Some(parsed.year()),
            Err(e) => {
                warn!("Unparseable release date {:?}: {}", date, e);
                None
            }
        }
    }

    fn details_from(movie: MovieResponse) -> MovieDetails {
        let directors = movie
            .credits
            .map(|credits| {
                credits
                    .crew
                    .into_iter()
                    .filter(|member| member.job.as_deref() == Some("Director"))
                    .map(|member| member.name)
                    .collect()
            })
            .unwrap_or_default();

        MovieDetails {
            directors,
            release_year: Self::release_year(movie.release_date.as_deref()),
            id: movie.id,
            title: movie.title,
            original_language: movie.original_language,
            runtime_mins: movie.runtime.unwrap_or_default(),
            budget: movie.budget.unwrap_or_default(),
            genres: movie.genres.into_iter().map(|g| g.name).collect(),
        }
    }
}

#[async_trait]
impl MetadataService for TmdbMetadata {
    async fn lookup_by_imdb(&self, imdb_id: &str) -> Result<Option<MovieDetails>> {
        let found: FindResponse = self
            .get_json(&format!(
                "/find/{}?external_source=imdb_id",
                urlencoding::encode(imdb_id)
            ))
            .await?;

        let movie_id = match found.movie_results.first() {
            Some(first) => {
                if found.movie_results.len() > 1 {
                    warn!(
                        "Found {} movies for {}, using the first one",
                        found.movie_results.len(),
                        imdb_id
                    );
                }
                first.id
            }
            None => {
                debug!("No metadata match for {}", imdb_id);
                return Ok(None);
            }
        };

        let movie: MovieResponse = self
            .get_json(&format!("/movie/{}?append_to_response=credits", movie_id))
            .await?;

        Ok(Some(Self::details_from(movie)))
    }

    async fn streaming_sources(&self, id: i64) -> Result<Vec<String>> {
        let providers: ProvidersResponse = self
            .get_json(&format!("/movie/{}/watch/providers", id))
            .await?;

        Ok(providers
            .results
            .get(&self.region)
            .map(|region| {
                region
                    .flatrate
                    .iter()
                    .map(|p| p.provider_name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_year_parsing() {
        assert_eq!(TmdbMetadata::release_year(Some("1986-04-23")), Some(1986));
        assert_eq!(TmdbMetadata::release_year(Some("")), None);
        assert_eq!(TmdbMetadata::release_year(Some("not-a-date")), None);
        assert_eq!(TmdbMetadata::release_year(None), None);
    }

    #[test]
    fn test_details_extracts_directors_only() {
        let movie = MovieResponse {
            id: 11416,
            title: "The Mission".to_string(),
            original_language: "en".to_string(),
            release_date: Some("1986-04-23".to_string()),
            runtime: Some(125),
            budget: Some(24_500_000),
            genres: vec![
                Genre {
                    name: "Drama".to_string(),
                },
                Genre {
                    name: "History".to_string(),
                },
            ],
            credits: Some(Credits {
                crew: vec![
                    CrewMember {
                        job: Some("Director".to_string()),
                        name: "Roland Joff\u{e9}".to_string(),
                    },
                    CrewMember {
                        job: Some("Producer".to_string()),
                        name: "David Puttnam".to_string(),
                    },
                    CrewMember {
                        job: None,
                        name: "Uncredited".to_string(),
                    },
                ],
            }),
        };

        let details = TmdbMetadata::details_from(movie);
        assert_eq!(details.directors, vec!["Roland Joff\u{e9}".to_string()]);
        assert_eq!(details.release_year, Some(1986));
        assert_eq!(details.runtime_mins, 125);
        assert_eq!(
            details.genres,
            vec!["Drama".to_string(), "History".to_string()]
        );
    }
}
