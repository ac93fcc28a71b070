use crate::catalog::Film;
use crate::config::ConfigError;
use crate::media_server::MediaServerService;
use crate::metadata::{MetadataService, MovieDetails};
use crate::queue::QueueService;
use crate::util::{intersection, matches_glob_of};
use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Caller-supplied filtering configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Earliest acceptable release year; 0 disables the floor
    pub earliest_year: i32,

    /// Original language the film must carry (exact, case-sensitive)
    pub language: Option<String>,

    /// Runtime bounds in minutes; equality survives both
    pub min_runtime_mins: Option<u32>,
    pub max_runtime_mins: Option<u32>,

    /// Keep films the user has already watched
    pub include_watched: bool,

    /// Genre allow-list; at least one must match when non-empty
    pub genres: Vec<String>,

    /// Director allow-list; at least one credited director must match
    pub directors: Vec<String>,

    /// Title glob allow-list; a title matching none is dropped
    pub title_globs: Vec<String>,

    /// Drop films that stream nowhere at all
    pub require_streaming: bool,

    /// Keep only films available on a subscribed service or locally
    pub only_my_streaming: bool,

    /// Keep only films NOT available on a subscribed service or locally
    pub only_not_my_streaming: bool,
}

impl FilterCriteria {
    /// The subscription-exclusivity filters are meaningless without a
    /// subscription list; reject the combination before any streaming
    /// begins.
    pub fn validate(&self, subscriptions: &[String]) -> Result<(), ConfigError> {
        if (self.only_my_streaming || self.only_not_my_streaming) && subscriptions.is_empty() {
            return Err(ConfigError::Invalid(
                "subscription-exclusivity filters require at least one subscribed service"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a candidate left the pipeline. One variant per predicate so each
/// disqualification is independently observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    TitleMismatch,
    AlreadyWatched,
    ReleasedTooEarly,
    NoImdbId,
    MetadataUnavailable,
    DirectorMismatch,
    WrongLanguage,
    TooLong,
    TooShort,
    NotStreaming,
    NotOnMyServices,
    OnMyServices,
    LocalLookupFailed,
    GenreMismatch,
    AlreadyQueued,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::TitleMismatch => "matches no title glob",
            Rejection::AlreadyWatched => "already watched",
            Rejection::ReleasedTooEarly => "released too early",
            Rejection::NoImdbId => "no IMDB identifier",
            Rejection::MetadataUnavailable => "no usable metadata",
            Rejection::DirectorMismatch => "no wanted director credited",
            Rejection::WrongLanguage => "wrong original language",
            Rejection::TooLong => "too long",
            Rejection::TooShort => "too short",
            Rejection::NotStreaming => "not streaming anywhere",
            Rejection::NotOnMyServices => "not on a subscribed service",
            Rejection::OnMyServices => "already on a subscribed service",
            Rejection::LocalLookupFailed => "media-server lookup failed",
            Rejection::GenreMismatch => "no wanted genre",
            Rejection::AlreadyQueued => "already in the download queue",
        };
        f.write_str(reason)
    }
}

/// A candidate that survived every predicate, bundled with everything the
/// emitter or queue-submission step needs.
#[derive(Debug, Clone)]
pub struct Qualified {
    pub film: Film,
    pub details: MovieDetails,
    pub streaming: Vec<String>,
    pub streaming_mine: Vec<String>,
    pub on_local_media: bool,
}

#[derive(Debug)]
pub enum Verdict {
    Keep(Box<Qualified>),
    Rejected(Rejection),
}

/// The filter/prune engine. Evaluates candidates one at a time against an
/// ordered battery of predicates, short-circuiting on the first
/// disqualification so no later collaborator call happens for a film that
/// is already out.
pub struct FilmPruner<'a> {
    criteria: &'a FilterCriteria,
    subscriptions: &'a [String],
    watched: &'a HashSet<String>,
    metadata: &'a dyn MetadataService,
    media_server: Option<&'a dyn MediaServerService>,
    queue: Option<&'a dyn QueueService>,
}

impl<'a> FilmPruner<'a> {
    pub fn new(
        criteria: &'a FilterCriteria,
        subscriptions: &'a [String],
        watched: &'a HashSet<String>,
        metadata: &'a dyn MetadataService,
        media_server: Option<&'a dyn MediaServerService>,
        queue: Option<&'a dyn QueueService>,
    ) -> Self {
        Self {
            criteria,
            subscriptions,
            watched,
            metadata,
            media_server,
            queue,
        }
    }

    /// Evaluate one candidate. Per-candidate lookup failures are logged and
    /// become rejections; only a queue-membership lookup failure is fatal,
    /// since it means the supplement run itself is misconfigured.
    pub async fn evaluate(&self, film: &Film) -> Result<Verdict> {
        // 1. Title glob allow-list
        if !self.criteria.title_globs.is_empty()
            && !matches_glob_of(&film.title, &self.criteria.title_globs)
        {
            return Ok(Verdict::Rejected(Rejection::TitleMismatch));
        }

        // 2. Already watched. Idempotent with the upstream aggregator.
        if !self.criteria.include_watched {
            if let Some(imdb) = &film.ids.imdb {
                if self.watched.contains(imdb) {
                    debug!("{:?} already watched", film.title);
                    return Ok(Verdict::Rejected(Rejection::AlreadyWatched));
                }
            }
        }

        // 3. Release-year floor, checked before any remote lookup
        if self.criteria.earliest_year > 0 && film.year < self.criteria.earliest_year {
            debug!("{:?} ({}) released too early", film.title, film.year);
            return Ok(Verdict::Rejected(Rejection::ReleasedTooEarly));
        }

        // 4. Metadata lookup
        let Some(imdb) = film.ids.imdb.as_deref() else {
            debug!("{:?} has no IMDB entry, skipping", film.title);
            return Ok(Verdict::Rejected(Rejection::NoImdbId));
        };
        let details = match self.metadata.lookup_by_imdb(imdb).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                warn!("No metadata for {:?} ({})", film.title, imdb);
                return Ok(Verdict::Rejected(Rejection::MetadataUnavailable));
            }
            Err(e) => {
                warn!("Error getting metadata for {:?}: {}", film.title, e);
                return Ok(Verdict::Rejected(Rejection::MetadataUnavailable));
            }
        };

        // 5. Director allow-list
        if !self.criteria.directors.is_empty()
            && intersection(&self.criteria.directors, &details.directors).is_empty()
        {
            debug!("{:?} has none of the wanted directors", film.title);
            return Ok(Verdict::Rejected(Rejection::DirectorMismatch));
        }

        // 6. Original language, exact match
        if let Some(language) = &self.criteria.language {
            if details.original_language != *language {
                debug!(
                    "{:?} is in {:?}, wanted {:?}",
                    film.title, details.original_language, language
                );
                return Ok(Verdict::Rejected(Rejection::WrongLanguage));
            }
        }

        // 7. Runtime bounds; equality survives
        if let Some(max) = self.criteria.max_runtime_mins {
            if details.runtime_mins > max {
                debug!("{:?} runs {}m, too long", film.title, details.runtime_mins);
                return Ok(Verdict::Rejected(Rejection::TooLong));
            }
        }
        if let Some(min) = self.criteria.min_runtime_mins {
            if details.runtime_mins < min {
                debug!("{:?} runs {}m, too short", film.title, details.runtime_mins);
                return Ok(Verdict::Rejected(Rejection::TooShort));
            }
        }

        // 8. Streaming-source resolution. A failed lookup means no sources,
        // not a dead run.
        let streaming = match self.metadata.streaming_sources(details.id).await {
            Ok(sources) => sources,
            Err(e) => {
                warn!("Error getting streaming sources for {:?}: {}", film.title, e);
                Vec::new()
            }
        };
        let streaming_mine = intersection(self.subscriptions, &streaming);

        if self.criteria.require_streaming && streaming.is_empty() {
            debug!("{:?} is not streaming anywhere", film.title);
            return Ok(Verdict::Rejected(Rejection::NotStreaming));
        }

        // 9. Local availability and subscription exclusivity
        let on_local_media = match self.media_server {
            Some(server) => match server.is_locally_available(&film.title, film.year).await {
                Ok(available) => available,
                Err(e) => {
                    warn!("Media-server lookup failed for {:?}: {}", film.title, e);
                    return Ok(Verdict::Rejected(Rejection::LocalLookupFailed));
                }
            },
            None => false,
        };

        if self.criteria.only_my_streaming && streaming_mine.is_empty() && !on_local_media {
            debug!("{:?} is not watchable on my services", film.title);
            return Ok(Verdict::Rejected(Rejection::NotOnMyServices));
        }
        if self.criteria.only_not_my_streaming && (!streaming_mine.is_empty() || on_local_media) {
            debug!("{:?} is already watchable on my services", film.title);
            return Ok(Verdict::Rejected(Rejection::OnMyServices));
        }

        // 10. Genre allow-list
        if !self.criteria.genres.is_empty()
            && intersection(&self.criteria.genres, &details.genres).is_empty()
        {
            debug!("{:?} has none of the wanted genres", film.title);
            return Ok(Verdict::Rejected(Rejection::GenreMismatch));
        }

        // 11. Existing-queue membership (supplement workflow only). Fatal
        // on error: an unreachable queue makes the whole run meaningless.
        if let Some(queue) = self.queue {
            if queue.has_entry_for(details.id).await? {
                debug!("{:?} already in the download queue", film.title);
                return Ok(Verdict::Rejected(Rejection::AlreadyQueued));
            }
        }

        Ok(Verdict::Keep(Box::new(Qualified {
            film: film.clone(),
            details,
            streaming,
            streaming_mine,
            on_local_media,
        })))
    }
}
