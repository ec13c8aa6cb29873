//! High-level floor generation orchestration: layout, corridors, doors, room kinds.

use rand_chacha::rand_core::Rng;
use tracing::{info, warn};

use crate::config::{ConfigError, FloorConfig};
use crate::types::{RoomId, RoomKind, TileKind};

use super::doors::detect_doors;
use super::grid::Grid;
use super::layout::{PlacementBounds, carve_room, carve_room_corridors, place_rooms};
use super::model::{GeneratedFloor, Room, RoomRect};
use super::seed::{GenerationSeed, random_usize};

const CHALLENGE_ROLL_THRESHOLD: usize = 15;
const TREASURE_ROLL_THRESHOLD: usize = 25;
const TRAP_ROLL_THRESHOLD: usize = 35;
const SHRINE_ROLL_THRESHOLD: usize = 45;

pub struct DungeonGenerator {
    config: FloorConfig,
}

impl DungeonGenerator {
    /// Fails fast when the configuration cannot produce a floor at all.
    pub fn new(config: FloorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FloorConfig {
        &self.config
    }

    /// Uses the configured seed, or a fresh runtime seed when none is set.
    pub fn generate(&self) -> GeneratedFloor {
        let seed = self.config.generation_seed().unwrap_or_else(GenerationSeed::runtime);
        self.generate_with_seed(seed)
    }

    pub fn generate_with_seed(&self, seed: GenerationSeed) -> GeneratedFloor {
        let width = self.config.width;
        let height = self.config.height;
        let mut rng = seed.rng();
        let mut grid = Grid::filled(width, height, TileKind::Wall);

        let target_count =
            random_usize(&mut rng, self.config.room_count.min, self.config.room_count.max);
        let rects = place_rooms(
            &mut rng,
            width,
            height,
            PlacementBounds {
                min_size: self.config.min_room_size,
                max_size: self.config.max_room_size,
                target_count,
            },
        );

        for rect in &rects {
            carve_room(&mut grid, rect);
        }
        carve_room_corridors(&mut grid, &mut rng, &rects);

        let kinds = assign_room_kinds(&mut rng, rects.len());
        let rooms: Vec<Room> = rects
            .iter()
            .zip(kinds)
            .enumerate()
            .map(|(index, (rect, kind))| build_room(&grid, &rects, index, *rect, kind))
            .collect();

        // Connected rooms always have a corridor cell on their ring.
        for room in rooms.iter().filter(|room| room.doors.is_empty()) {
            warn!(room = room.id.0, ?room.rect, "room has no detected doorway");
        }

        let spawn_point = rects[0].center();
        let exit_point = rects[rects.len() - 1].center();

        info!(
            %seed,
            width,
            height,
            rooms = rooms.len(),
            target = target_count,
            floor_cells = grid.floor_count(),
            "generated floor"
        );

        GeneratedFloor { seed, grid, rooms, spawn_point, exit_point }
    }
}

fn build_room(
    grid: &Grid,
    rects: &[RoomRect],
    index: usize,
    rect: RoomRect,
    kind: RoomKind,
) -> Room {
    Room {
        id: RoomId(index as u32),
        rect,
        center: rect.center(),
        kind,
        doors: detect_doors(grid, &rect, rects),
    }
}

/// First room is the spawn, last is the exit, the rest roll a gameplay kind.
fn assign_room_kinds(rng: &mut impl Rng, room_count: usize) -> Vec<RoomKind> {
    (0..room_count)
        .map(|index| {
            if index == 0 {
                RoomKind::Spawn
            } else if index + 1 == room_count {
                RoomKind::Exit
            } else {
                roll_room_kind(random_usize(rng, 0, 99))
            }
        })
        .collect()
}

fn roll_room_kind(roll: usize) -> RoomKind {
    if roll < CHALLENGE_ROLL_THRESHOLD {
        RoomKind::Challenge
    } else if roll < TREASURE_ROLL_THRESHOLD {
        RoomKind::Treasure
    } else if roll < TRAP_ROLL_THRESHOLD {
        RoomKind::Trap
    } else if roll < SHRINE_ROLL_THRESHOLD {
        RoomKind::Shrine
    } else {
        RoomKind::Normal
    }
}
