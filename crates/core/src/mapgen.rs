//! Procedural floor generation split into coherent submodules.

pub mod grid;
pub mod model;

mod doors;
mod generator;
mod layout;
pub(crate) mod seed;

pub use generator::DungeonGenerator;
pub use grid::Grid;
pub use layout::ROOM_PADDING;
pub use model::{GeneratedFloor, Room, RoomRect};
pub use seed::{GenerationSeed, generate_runtime_seed};

use crate::config::{ConfigError, FloorConfig};

/// Generates a floor with default room parameters.
///
/// With `seed` the output is fully deterministic; without it a fresh runtime seed is drawn.
pub fn generate(
    width: usize,
    height: usize,
    seed: Option<&str>,
) -> Result<GeneratedFloor, ConfigError> {
    let config =
        FloorConfig { width, height, seed: seed.map(str::to_owned), ..FloorConfig::default() };
    Ok(DungeonGenerator::new(config)?.generate())
}
