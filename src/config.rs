use crate::metadata::TMDB_BASE_URL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for a cinesift invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Who the recommendations are for.
    pub profile: ProfileConfig,

    /// Film catalog (list/watchlist scraping) settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Metadata API settings
    pub metadata: MetadataConfig,

    /// Local media-server settings; absent when no server is run
    #[serde(default)]
    pub media_server: Option<MediaServerConfig>,

    /// Download-queue settings; required only by the supplement workflow
    #[serde(default)]
    pub queue: Option<QueueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Catalog username whose watched history and watchlist are consulted
    pub letterboxd_username: String,

    /// Streaming services the user pays for
    #[serde(default)]
    pub subscribed_services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub api_key: String,

    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,

    /// Region used when resolving streaming availability
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaServerConfig {
    pub url: String,
    pub token: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub url: String,
    pub api_key: String,

    /// Quality profile applied to every submitted film; must exist
    pub quality_profile: String,

    /// Library path the queue downloads into
    pub root_folder: String,

    /// Tag attached to every submission so they can be found later
    #[serde(default = "default_tag_label")]
    pub tag_label: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_metadata_base_url() -> String {
    TMDB_BASE_URL.to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tag_label() -> String {
    "cinesift-supplement".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://letterboxd.com".to_string(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variables: {0:?}")]
    MissingEnv(Vec<String>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from the usual file locations, falling back to
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config_paths = [
            "cinesift.toml",
            "config/cinesift.toml",
            "~/.config/cinesift/config.toml",
            "/etc/cinesift/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.validate()?;
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `CINESIFT_*` environment variables. Missing
    /// required variables are reported together rather than one at a time.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let username = require_env("CINESIFT_LETTERBOXD_USER", &mut missing);
        let tmdb_key = require_env("CINESIFT_TMDB_KEY", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let subscribed_services = std::env::var("CINESIFT_SUBSCRIBED")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let media_server = match (
            std::env::var("CINESIFT_PLEX_URL"),
            std::env::var("CINESIFT_PLEX_TOKEN"),
        ) {
            (Ok(url), Ok(token)) => Some(MediaServerConfig {
                url,
                token,
                request_timeout_secs: default_timeout_secs(),
            }),
            _ => None,
        };

        let queue = match (
            std::env::var("CINESIFT_RADARR_URL"),
            std::env::var("CINESIFT_RADARR_KEY"),
        ) {
            (Ok(url), Ok(api_key)) => Some(QueueConfig {
                url,
                api_key,
                quality_profile: std::env::var("CINESIFT_RADARR_QUALITY").unwrap_or_default(),
                root_folder: std::env::var("CINESIFT_RADARR_PATH").unwrap_or_default(),
                tag_label: default_tag_label(),
                request_timeout_secs: default_timeout_secs(),
            }),
            _ => None,
        };

        Ok(Self {
            profile: ProfileConfig {
                letterboxd_username: username,
                subscribed_services,
            },
            catalog: CatalogConfig::default(),
            metadata: MetadataConfig {
                api_key: tmdb_key,
                base_url: default_metadata_base_url(),
                region: std::env::var("CINESIFT_REGION").unwrap_or_else(|_| default_region()),
                request_timeout_secs: default_timeout_secs(),
            },
            media_server,
            queue,
        })
    }

    /// Validate configuration invariants that hold for every workflow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile.letterboxd_username.is_empty() {
            return Err(ConfigError::Invalid(
                "profile.letterboxd_username is required".to_string(),
            ));
        }
        if self.metadata.api_key.is_empty() {
            return Err(ConfigError::Invalid(
                "metadata.api_key is required".to_string(),
            ));
        }
        if let Some(queue) = &self.queue {
            if queue.quality_profile.is_empty() {
                return Err(ConfigError::Invalid(
                    "queue.quality_profile is required when a queue is configured".to_string(),
                ));
            }
            if queue.root_folder.is_empty() {
                return Err(ConfigError::Invalid(
                    "queue.root_folder is required when a queue is configured".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn require_env(name: &str, missing: &mut Vec<String>) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

/// Configuration builder for programmatic config creation.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                profile: ProfileConfig {
                    letterboxd_username: String::new(),
                    subscribed_services: Vec::new(),
                },
                catalog: CatalogConfig::default(),
                metadata: MetadataConfig {
                    api_key: String::new(),
                    base_url: default_metadata_base_url(),
                    region: default_region(),
                    request_timeout_secs: default_timeout_secs(),
                },
                media_server: None,
                queue: None,
            },
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.config.profile.letterboxd_username = username.into();
        self
    }

    pub fn with_subscriptions(mut self, services: Vec<String>) -> Self {
        self.config.profile.subscribed_services = services;
        self
    }

    pub fn with_metadata_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.metadata.api_key = api_key.into();
        self
    }

    pub fn with_media_server(mut self, server: MediaServerConfig) -> Self {
        self.config.media_server = Some(server);
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.config.queue = Some(queue);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
