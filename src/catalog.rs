use crate::lists::ListRef;
use crate::stream::{stream_channel, ItemSender, ItemStream};
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// External identifiers carried by a catalog film.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalIds {
    pub imdb: Option<String>,
    pub tmdb: Option<String>,
}

/// One film surfaced from a catalog list. Read-only input to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Film {
    pub title: String,
    pub year: i32,
    pub ids: ExternalIds,
}

impl Film {
    /// Stable identity used for deduplication: external ID when present,
    /// title and year otherwise.
    pub fn identity(&self) -> String {
        if let Some(imdb) = &self.ids.imdb {
            return imdb.clone();
        }
        if let Some(tmdb) = &self.ids.tmdb {
            return format!("tmdb:{}", tmdb);
        }
        format!("{}::{}", self.title, self.year)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog page did not parse: {0}")]
    Parse(String),
}

/// Which upstream sources to draw candidate films from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSpec {
    pub lists: Vec<ListRef>,
    pub watchlists: Vec<String>,
}

impl BatchSpec {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.watchlists.is_empty()
    }
}

/// Catalog collaborator: independently-paced streams of films drawn from
/// named lists, watchlists and the user's watched history.
pub trait CatalogService: Send + Sync {
    /// Stream every candidate film named by the batch spec.
    fn stream_candidates(&self, spec: BatchSpec) -> ItemStream<Film, CatalogError>;

    /// Stream the user's watched films.
    fn stream_watched(&self, username: &str) -> ItemStream<Film, CatalogError>;
}

/// Scraping client for the public pages of letterboxd.com.
#[derive(Clone)]
pub struct LetterboxdCatalog {
    client: reqwest::Client,
    base_url: String,
}

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl LetterboxdCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_page(&self, path: &str) -> Result<String, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Fetching catalog page {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Film slugs on one paginated list/watchlist/films page. An empty
    /// result means pagination has run off the end.
    fn parse_film_slugs(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Ok(tile) = Selector::parse("li.poster-container div.film-poster") else {
            return Vec::new();
        };
        document
            .select(&tile)
            .filter_map(|poster| poster.value().attr("data-film-slug"))
            .map(|slug| slug.trim_matches('/').to_string())
            .collect()
    }

    /// Fetch a film's detail page and pull out title, year and external IDs.
    async fn fetch_film(&self, slug: &str) -> Result<Film, CatalogError> {
        let html = self.fetch_page(&format!("/film/{}/", slug)).await?;
        Self::parse_film_page(&html, slug)
    }

    fn parse_film_page(html: &str, slug: &str) -> Result<Film, CatalogError> {
        let document = Html::parse_document(html);

        let og_title = Selector::parse(r#"meta[property="og:title"]"#)
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .next()
                    .and_then(|meta| meta.value().attr("content"))
                    .map(str::to_string)
            })
            .ok_or_else(|| CatalogError::Parse(format!("film page {:?} has no og:title", slug)))?;

        // og:title reads "Title (1986)"; films without a release date drop
        // the parenthetical.
        let (title, year) = match Regex::new(r"^(.*) \((\d{4})\)$")
            .ok()
            .and_then(|re| {
                re.captures(&og_title).map(|caps| {
                    (
                        caps[1].to_string(),
                        caps[2].parse::<i32>().unwrap_or_default(),
                    )
                })
            }) {
            Some(parsed) => parsed,
            None => (og_title.clone(), 0),
        };

        let imdb = Self::tracked_link(&document, "IMDb")
            .and_then(|href| Self::capture(&href, r"/title/(tt\d+)"));
        let tmdb = Self::tracked_link(&document, "TMDb")
            .and_then(|href| Self::capture(&href, r"/movie/(\d+)"));

        Ok(Film {
            title,
            year,
            ids: ExternalIds { imdb, tmdb },
        })
    }

    fn tracked_link(document: &Html, action: &str) -> Option<String> {
        let selector = Selector::parse(&format!(r#"a[data-track-action="{}"]"#, action)).ok()?;
        document
            .select(&selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
    }

    fn capture(text: &str, pattern: &str) -> Option<String> {
        Regex::new(pattern)
            .ok()?
            .captures(text)
            .map(|caps| caps[1].to_string())
    }

    /// Walk the numbered pages under `base_path`, emitting one film per
    /// poster tile. Returns false once the stream has ended (error sent, or
    /// consumer gone).
    async fn stream_paged(
        &self,
        tx: &ItemSender<Film, CatalogError>,
        base_path: &str,
    ) -> bool {
        let mut page = 1u32;
        loop {
            let path = format!("{}/page/{}/", base_path, page);
            let html = match self.fetch_page(&path).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Catalog stream for {} failed: {}", base_path, e);
                    let _ = tx.send(Err(e)).await;
                    return false;
                }
            };

            let slugs = Self::parse_film_slugs(&html);
            if slugs.is_empty() {
                return true;
            }

            for slug in slugs {
                let film = match self.fetch_film(&slug).await {
                    Ok(film) => film,
                    Err(e) => {
                        warn!("Failed to fetch film {}: {}", slug, e);
                        let _ = tx.send(Err(e)).await;
                        return false;
                    }
                };
                if tx.send(Ok(film)).await.is_err() {
                    debug!("Consumer dropped the stream, stopping producer");
                    return false;
                }
            }
            page += 1;
        }
    }
}

impl CatalogService for LetterboxdCatalog {
    fn stream_candidates(&self, spec: BatchSpec) -> ItemStream<Film, CatalogError> {
        let (tx, rx) = stream_channel();
        let catalog = self.clone();
        tokio::spawn(async move {
            for user in &spec.watchlists {
                if !catalog
                    .stream_paged(&tx, &format!("/{}/watchlist", user))
                    .await
                {
                    return;
                }
            }
            for list in &spec.lists {
                if !catalog
                    .stream_paged(&tx, &format!("/{}/list/{}", list.owner, list.slug))
                    .await
                {
                    return;
                }
            }
        });
        rx
    }

    fn stream_watched(&self, username: &str) -> ItemStream<Film, CatalogError> {
        let (tx, rx) = stream_channel();
        let catalog = self.clone();
        let path = format!("/{}/films", username);
        tokio::spawn(async move {
            catalog.stream_paged(&tx, &path).await;
        });
        rx
    }
}
