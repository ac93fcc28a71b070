use crate::catalog::{BatchSpec, CatalogService, Film, LetterboxdCatalog};
use crate::config::{Config, ProfileConfig, QueueConfig};
use crate::filter::{FilmPruner, FilterCriteria, Verdict};
use crate::lists::ListRef;
use crate::media_server::{MediaServerService, PlexMediaServer};
use crate::metadata::{MetadataService, TmdbMetadata};
use crate::queue::{AddMovieOptions, AddMovieRequest, QueueService, RadarrQueue};
use crate::recommend::{emit, Recommendation};
use crate::stream::drain;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Collaborator bundle constructed once at the top of a run and passed by
/// reference into every pipeline stage.
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub metadata: Arc<dyn MetadataService>,
    pub media_server: Option<Arc<dyn MediaServerService>>,
    pub queue: Option<Arc<dyn QueueService>>,
}

impl Collaborators {
    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = LetterboxdCatalog::new(
            &config.catalog.base_url,
            Duration::from_secs(config.catalog.request_timeout_secs),
        );
        let metadata = TmdbMetadata::new(
            &config.metadata.base_url,
            &config.metadata.api_key,
            &config.metadata.region,
            Duration::from_secs(config.metadata.request_timeout_secs),
        )?;

        let media_server = match &config.media_server {
            Some(server) => Some(Arc::new(PlexMediaServer::new(
                &server.url,
                &server.token,
                Duration::from_secs(server.request_timeout_secs),
            )?) as Arc<dyn MediaServerService>),
            None => None,
        };

        let queue = match &config.queue {
            Some(queue) => Some(Arc::new(RadarrQueue::new(
                &queue.url,
                &queue.api_key,
                Duration::from_secs(queue.request_timeout_secs),
            )?) as Arc<dyn QueueService>),
            None => None,
        };

        Ok(Self {
            catalog: Arc::new(catalog),
            metadata: Arc::new(metadata),
            media_server,
            queue,
        })
    }
}

/// Which upstream sources feed the candidate stream.
#[derive(Debug, Clone, Default)]
pub struct CollectionCriteria {
    pub lists: Vec<ListRef>,
    pub include_watchlist: bool,
    pub include_top250: bool,
}

/// The canonical top-250 narrative list, maintained on the catalog site.
pub fn top250_list() -> ListRef {
    ListRef::known("dave/official-top-250-narrative-feature-films")
}

impl CollectionCriteria {
    pub fn batch_spec(&self, username: &str) -> BatchSpec {
        let mut spec = BatchSpec {
            lists: self.lists.clone(),
            watchlists: Vec::new(),
        };
        if self.include_watchlist {
            spec.watchlists.push(username.to_string());
        }
        if self.include_top250 {
            spec.lists.push(top250_list());
        }
        spec
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub watched: usize,
    pub collected: usize,
    pub evaluated: usize,
    pub rejected: usize,
    pub kept: usize,
}

/// Candidate aggregator: drop films whose external identifier is already in
/// the watched set, then deduplicate first-seen. `include_watched` turns the
/// watched check into a pass-through.
pub fn unseen_candidates(
    films: Vec<Film>,
    watched: &HashSet<String>,
    include_watched: bool,
) -> Vec<Film> {
    let mut seen = HashSet::new();
    films
        .into_iter()
        .filter(|film| {
            include_watched
                || film
                    .ids
                    .imdb
                    .as_ref()
                    .map_or(true, |id| !watched.contains(id))
        })
        .filter(|film| seen.insert(film.identity()))
        .collect()
}

/// Fully drain the watched-films stream into an identifier set. Watched
/// entries without an external ID are skipped with a log line.
async fn watched_ids(
    collaborators: &Collaborators,
    username: &str,
    include_watched: bool,
) -> Result<HashSet<String>> {
    if include_watched {
        return Ok(HashSet::new());
    }

    info!("🎞️  Collecting watched films for {}", username);
    let films = drain(collaborators.catalog.stream_watched(username))
        .await
        .context("failed to stream watched films")?;

    let mut ids = HashSet::new();
    for film in &films {
        match film.ids.imdb.as_deref() {
            Some(id) if !id.is_empty() => {
                ids.insert(id.to_string());
            }
            _ => debug!("Watched entry {:?} has no external ID, skipping", film.title),
        }
    }
    Ok(ids)
}

async fn collect_candidates(
    collaborators: &Collaborators,
    spec: BatchSpec,
) -> Result<Vec<Film>> {
    if spec.is_empty() {
        warn!("No candidate sources configured, output will be empty");
    }
    info!("🎬 Collecting candidate films");
    drain(collaborators.catalog.stream_candidates(spec))
        .await
        .context("failed to stream candidate films")
}

/// Recommend workflow: collect, aggregate, filter, and emit each survivor
/// as soon as it qualifies.
pub async fn run_recommend<W: Write>(
    collaborators: &Collaborators,
    profile: &ProfileConfig,
    criteria: &FilterCriteria,
    collection: &CollectionCriteria,
    out: &mut W,
) -> Result<RunStats> {
    criteria.validate(&profile.subscribed_services)?;
    let started = Instant::now();

    let watched = watched_ids(collaborators, &profile.letterboxd_username, criteria.include_watched).await?;
    let films = collect_candidates(
        collaborators,
        collection.batch_spec(&profile.letterboxd_username),
    )
    .await?;

    let mut stats = RunStats {
        watched: watched.len(),
        collected: films.len(),
        ..Default::default()
    };

    let candidates = unseen_candidates(films, &watched, criteria.include_watched);
    let pruner = FilmPruner::new(
        criteria,
        &profile.subscribed_services,
        &watched,
        collaborators.metadata.as_ref(),
        collaborators.media_server.as_deref(),
        None,
    );

    for film in &candidates {
        stats.evaluated += 1;
        match pruner.evaluate(film).await? {
            Verdict::Keep(qualified) => {
                stats.kept += 1;
                emit(&Recommendation::from(qualified.as_ref()), out)?;
            }
            Verdict::Rejected(reason) => {
                stats.rejected += 1;
                debug!("Rejected {:?}: {}", film.title, reason);
            }
        }
    }

    info!(
        "✅ Recommended {} of {} candidates in {:.2}s",
        stats.kept,
        stats.evaluated,
        started.elapsed().as_secs_f64()
    );
    Ok(stats)
}

/// Supplement workflow: filter candidates down to films the user cannot
/// already watch, then submit each survivor to the download queue.
pub async fn run_supplement(
    collaborators: &Collaborators,
    profile: &ProfileConfig,
    criteria: &FilterCriteria,
    lists: &[ListRef],
    queue_config: &QueueConfig,
    dry_run: bool,
) -> Result<RunStats> {
    let queue = collaborators
        .queue
        .as_ref()
        .ok_or_else(|| anyhow!("supplement requires a configured download queue"))?;
    criteria.validate(&profile.subscribed_services)?;
    let started = Instant::now();

    // Resolve the quality tier and tag once per run. A missing tier is a
    // misconfigured run, not a transient condition.
    let profile_name = &queue_config.quality_profile;
    let quality = queue
        .quality_profile_by_name(profile_name)
        .await?
        .ok_or_else(|| anyhow!("quality profile {:?} not found in the download queue", profile_name))?;
    let tag_id = queue.get_or_create_tag(&queue_config.tag_label).await?;

    let watched = watched_ids(collaborators, &profile.letterboxd_username, criteria.include_watched).await?;
    let films = collect_candidates(
        collaborators,
        BatchSpec {
            lists: lists.to_vec(),
            watchlists: Vec::new(),
        },
    )
    .await?;

    let mut stats = RunStats {
        watched: watched.len(),
        collected: films.len(),
        ..Default::default()
    };

    let candidates = unseen_candidates(films, &watched, criteria.include_watched);
    let pruner = FilmPruner::new(
        criteria,
        &profile.subscribed_services,
        &watched,
        collaborators.metadata.as_ref(),
        collaborators.media_server.as_deref(),
        Some(queue.as_ref()),
    );

    let mut to_add = Vec::new();
    for film in &candidates {
        stats.evaluated += 1;
        match pruner.evaluate(film).await? {
            Verdict::Keep(qualified) => {
                to_add.push(AddMovieRequest {
                    title: qualified.film.title.clone(),
                    year: qualified.film.year,
                    tmdb_id: qualified.details.id,
                    quality_profile_id: quality.id,
                    root_folder_path: queue_config.root_folder.clone(),
                    monitored: true,
                    tags: vec![tag_id],
                    add_options: AddMovieOptions {
                        search_for_movie: true,
                    },
                });
            }
            Verdict::Rejected(reason) => {
                stats.rejected += 1;
                debug!("Rejected {:?}: {}", film.title, reason);
            }
        }
    }
    stats.kept = to_add.len();

    if dry_run {
        for request in &to_add {
            info!("Dry run, not submitting {:?}", request.title);
        }
    } else {
        for request in &to_add {
            info!("📥 Submitting {:?} to the download queue", request.title);
            queue
                .submit(request)
                .await
                .with_context(|| format!("failed to submit {:?}", request.title))?;
        }
    }

    info!(
        "✅ Queued {} of {} candidates in {:.2}s{}",
        stats.kept,
        stats.evaluated,
        started.elapsed().as_secs_f64(),
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(stats)
}
