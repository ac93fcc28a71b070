/// cinesift - film recommendation pipeline
///
/// Merges streamed candidates from catalog lists with the user's watched
/// history, then prunes them against metadata, streaming subscriptions, a
/// local media server and an existing download queue.

pub mod catalog;
pub mod config;
pub mod filter;
pub mod lists;
pub mod media_server;
pub mod metadata;
pub mod pipeline;
pub mod queue;
pub mod recommend;
pub mod stream;
pub mod util;

// Re-export main types for easy access
pub use crate::catalog::{BatchSpec, CatalogService, ExternalIds, Film, LetterboxdCatalog};
pub use crate::config::{Config, ConfigBuilder, ConfigError, ProfileConfig};
pub use crate::filter::{FilmPruner, FilterCriteria, Qualified, Rejection, Verdict};
pub use crate::lists::{parse_list_refs, ListRef, ListRefError};
pub use crate::media_server::{MediaServerService, PlexMediaServer};
pub use crate::metadata::{MetadataService, MovieDetails, TmdbMetadata};
pub use crate::pipeline::{
    run_recommend, run_supplement, Collaborators, CollectionCriteria, RunStats,
};
pub use crate::queue::{AddMovieRequest, QualityProfile, QueueService, RadarrQueue};
pub use crate::recommend::Recommendation;
