//! Per-floor configuration, TOML loading, and fail-fast validation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapgen::GenerationSeed;
use crate::types::Theme;

/// Smallest room edge the generator and spawner can work with.
pub const MIN_SUPPORTED_ROOM_SIZE: usize = 3;
/// Smallest grid edge that still fits the two-room fallback layout: a wall border,
/// two minimum rooms and the padding between them.
pub const MIN_GRID_SIZE: usize = 2 * MIN_SUPPORTED_ROOM_SIZE + 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum room size {min} exceeds maximum room size {max}")]
    MinRoomLargerThanMax { min: usize, max: usize },
    #[error("minimum room size {min} must be at least {}", MIN_SUPPORTED_ROOM_SIZE)]
    RoomTooSmall { min: usize },
    #[error("minimum room size {min} does not fit inside a {width}x{height} grid")]
    RoomLargerThanGrid { min: usize, width: usize, height: usize },
    #[error("grid {width}x{height} is smaller than {}x{}", MIN_GRID_SIZE, MIN_GRID_SIZE)]
    GridTooSmall { width: usize, height: usize },
    #[error("room count range {min}..={max} is empty")]
    EmptyRoomCountRange { min: usize, max: usize },
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCountRange {
    pub min: usize,
    pub max: usize,
}

/// Options recognized once per floor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloorConfig {
    pub width: usize,
    pub height: usize,
    pub min_room_size: usize,
    pub max_room_size: usize,
    pub room_count: RoomCountRange,
    pub depth: u32,
    pub seed: Option<String>,
    pub theme: Option<Theme>,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 45,
            min_room_size: 6,
            max_room_size: 11,
            room_count: RoomCountRange { min: 6, max: 10 },
            depth: 1,
            seed: None,
            theme: None,
        }
    }
}

impl FloorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse_at(raw, Path::new("<inline>"))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse_at(&raw, path)
    }

    fn parse_at(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_GRID_SIZE || self.height < MIN_GRID_SIZE {
            return Err(ConfigError::GridTooSmall { width: self.width, height: self.height });
        }
        if self.min_room_size < MIN_SUPPORTED_ROOM_SIZE {
            return Err(ConfigError::RoomTooSmall { min: self.min_room_size });
        }
        if self.min_room_size > self.max_room_size {
            return Err(ConfigError::MinRoomLargerThanMax {
                min: self.min_room_size,
                max: self.max_room_size,
            });
        }
        if self.min_room_size + 2 > self.width || self.min_room_size + 2 > self.height {
            return Err(ConfigError::RoomLargerThanGrid {
                min: self.min_room_size,
                width: self.width,
                height: self.height,
            });
        }
        if self.room_count.min == 0 || self.room_count.min > self.room_count.max {
            return Err(ConfigError::EmptyRoomCountRange {
                min: self.room_count.min,
                max: self.room_count.max,
            });
        }
        Ok(())
    }

    /// Seed requested for generation, if any.
    pub fn generation_seed(&self) -> Option<GenerationSeed> {
        self.seed.as_deref().map(GenerationSeed::parse)
    }

    /// Depth clamped to the first floor.
    pub fn effective_depth(&self) -> u32 {
        self.depth.max(1)
    }
}
