//! Configuration management for the Folio server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::assembly::{ImageFormat, DEFAULT_TILES_PER_PAGE};
use crate::document::TrackerSettings;
use crate::exchange::UrlPatterns;
use crate::types::DocumentId;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tracking: TrackingConfig,
    pub patterns: UrlPatterns,
    pub storage: StorageConfig,
    pub finalize: FinalizeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Document ids to assemble; everything else is ignored
    pub wanted: Vec<DocumentId>,
    pub tiles_per_page: usize,
    pub image_format: ImageFormat,
    /// JPEG quality, 1..=100
    pub quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub image_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeConfig {
    /// Concurrent PDF writers
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a timestamped file in this directory
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid document id in WANTED_DOCUMENTS: {0:?}")]
    InvalidDocumentId(String),

    #[error("Invalid TILE_FORMAT: {0}")]
    InvalidImageFormat(String),

    #[error("TILES_PER_PAGE must be at least 1")]
    ZeroTilesPerPage,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8731,
            },
            tracking: TrackingConfig {
                wanted: Vec::new(),
                tiles_per_page: DEFAULT_TILES_PER_PAGE,
                image_format: ImageFormat::Jpeg,
                quality: 85,
            },
            patterns: UrlPatterns::default(),
            storage: StorageConfig {
                image_dir: PathBuf::from("./book_images"),
                output_dir: PathBuf::from("./download_book"),
            },
            finalize: FinalizeConfig { workers: 2 },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Read from the environment. Unset or unparseable numeric values fall
    /// back to the defaults; document ids, the tile format and a zero tile
    /// count are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let patterns = UrlPatterns::default();

        let tiles_per_page = env_parse("TILES_PER_PAGE", defaults.tracking.tiles_per_page);
        if tiles_per_page == 0 {
            return Err(ConfigError::ZeroTilesPerPage);
        }

        let image_format = match env::var("TILE_FORMAT") {
            Ok(value) => value
                .parse::<ImageFormat>()
                .map_err(ConfigError::InvalidImageFormat)?,
            Err(_) => defaults.tracking.image_format,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
            },
            tracking: TrackingConfig {
                wanted: parse_document_ids(&env::var("WANTED_DOCUMENTS").unwrap_or_default())?,
                tiles_per_page,
                image_format,
                quality: env_parse("TILE_QUALITY", defaults.tracking.quality).clamp(1, 100),
            },
            patterns: UrlPatterns {
                tile: env::var("MATCH_TILE").unwrap_or(patterns.tile),
                pre_tile: env::var("MATCH_PRE_TILE").unwrap_or(patterns.pre_tile),
                metadata: env::var("MATCH_METADATA").unwrap_or(patterns.metadata),
                bookmark: env::var("MATCH_BOOKMARK").unwrap_or(patterns.bookmark),
            },
            storage: StorageConfig {
                image_dir: env::var("IMAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.image_dir),
                output_dir: env::var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
            },
            finalize: FinalizeConfig {
                workers: env_parse("FINALIZE_WORKERS", defaults.finalize.workers).max(1),
            },
            logging: LoggingConfig::from_env(),
        })
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            tiles_per_page: self.tracking.tiles_per_page,
            image_format: self.tracking.image_format,
            quality: self.tracking.quality,
            image_dir: self.storage.image_dir.clone(),
            output_dir: self.storage.output_dir.clone(),
        }
    }
}

impl LoggingConfig {
    /// Read on its own so logging can start before the rest is validated
    pub fn from_env() -> Self {
        LoggingConfig {
            log_dir: env::var("LOG_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Comma or whitespace separated list of ids
pub fn parse_document_ids(value: &str) -> Result<Vec<DocumentId>, ConfigError> {
    let mut ids = Vec::new();
    for item in value.split(|c: char| c == ',' || c.is_whitespace()) {
        if item.is_empty() {
            continue;
        }
        let id = item
            .parse()
            .map_err(|_| ConfigError::InvalidDocumentId(item.to_string()))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
