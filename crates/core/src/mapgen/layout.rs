//! Room placement and corridor carving logic for base map topology.

use rand_chacha::rand_core::Rng;
use tracing::{debug, warn};

use crate::config::MIN_SUPPORTED_ROOM_SIZE;
use crate::types::Pos;

use super::grid::Grid;
use super::model::RoomRect;
use super::seed::{random_bool, random_usize};

pub(super) const CORRIDOR_WIDTH: i32 = 2;
/// Minimum wall gap kept between any two rooms.
pub const ROOM_PADDING: usize = CORRIDOR_WIDTH as usize;

const ATTEMPTS_PER_ROOM: usize = 50;
const RELAXED_RETRY_ROUNDS: usize = 4;
const FALLBACK_ROOM_SIZE: usize = MIN_SUPPORTED_ROOM_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct PlacementBounds {
    pub(super) min_size: usize,
    pub(super) max_size: usize,
    pub(super) target_count: usize,
}

/// Places rooms in acceptance order, relaxing size bounds until at least two fit.
pub(super) fn place_rooms(
    rng: &mut impl Rng,
    width: usize,
    height: usize,
    bounds: PlacementBounds,
) -> Vec<RoomRect> {
    let mut round_bounds = bounds;
    for round in 0..=RELAXED_RETRY_ROUNDS {
        let rooms = place_rooms_once(rng, width, height, round_bounds);
        if rooms.len() >= 2 {
            if rooms.len() < bounds.target_count {
                debug!(
                    accepted = rooms.len(),
                    target = bounds.target_count,
                    round,
                    "room placement accepted fewer rooms than targeted"
                );
            }
            return rooms;
        }
        warn!(
            accepted = rooms.len(),
            round,
            min_size = round_bounds.min_size,
            max_size = round_bounds.max_size,
            "room placement fell short, relaxing size bounds"
        );
        round_bounds = relaxed(round_bounds);
    }

    warn!(width, height, "room placement exhausted retries, using corner fallback");
    fallback_rooms(width, height)
}

fn place_rooms_once(
    rng: &mut impl Rng,
    width: usize,
    height: usize,
    bounds: PlacementBounds,
) -> Vec<RoomRect> {
    let mut rooms: Vec<RoomRect> = Vec::with_capacity(bounds.target_count);
    for _ in 0..(ATTEMPTS_PER_ROOM * bounds.target_count) {
        if rooms.len() >= bounds.target_count {
            break;
        }
        let room_width = random_usize(rng, bounds.min_size, bounds.max_size);
        let room_height = random_usize(rng, bounds.min_size, bounds.max_size);
        if room_width + 2 > width || room_height + 2 > height {
            continue;
        }

        let x = random_usize(rng, 1, width - room_width - 1);
        let y = random_usize(rng, 1, height - room_height - 1);
        let candidate = RoomRect { x, y, width: room_width, height: room_height };
        if rooms.iter().any(|existing| existing.expanded(ROOM_PADDING).intersects(&candidate)) {
            continue;
        }
        rooms.push(candidate);
    }
    rooms
}

fn relaxed(bounds: PlacementBounds) -> PlacementBounds {
    let max_size = ((bounds.max_size * 2) / 3).max(FALLBACK_ROOM_SIZE);
    let min_size = ((bounds.min_size * 2) / 3).clamp(FALLBACK_ROOM_SIZE, max_size);
    PlacementBounds { min_size, max_size, target_count: bounds.target_count }
}

fn fallback_rooms(width: usize, height: usize) -> Vec<RoomRect> {
    vec![
        RoomRect { x: 1, y: 1, width: FALLBACK_ROOM_SIZE, height: FALLBACK_ROOM_SIZE },
        RoomRect {
            x: width - FALLBACK_ROOM_SIZE - 1,
            y: height - FALLBACK_ROOM_SIZE - 1,
            width: FALLBACK_ROOM_SIZE,
            height: FALLBACK_ROOM_SIZE,
        },
    ]
}

pub(super) fn carve_room(grid: &mut Grid, room: &RoomRect) {
    for y in room.y..=room.bottom() {
        for x in room.x..=room.right() {
            grid.carve(Pos { y: y as i32, x: x as i32 });
        }
    }
}

/// Links each room to the one accepted before it.
pub(super) fn carve_room_corridors(grid: &mut Grid, rng: &mut impl Rng, rooms: &[RoomRect]) {
    for pair in rooms.windows(2) {
        let horizontal_first = random_bool(rng);
        carve_l_shaped_corridor(grid, pair[0].center(), pair[1].center(), horizontal_first);
    }
}

fn carve_l_shaped_corridor(grid: &mut Grid, start: Pos, end: Pos, horizontal_first: bool) {
    if horizontal_first {
        carve_horizontal_leg(grid, start.y, start.x, end.x);
        carve_vertical_leg(grid, end.x, start.y, end.y);
    } else {
        carve_vertical_leg(grid, start.x, start.y, end.y);
        carve_horizontal_leg(grid, end.y, start.x, end.x);
    }
}

fn carve_horizontal_leg(grid: &mut Grid, y: i32, left_x: i32, right_x: i32) {
    let from_x = left_x.min(right_x);
    let to_x = left_x.max(right_x);
    for x in from_x..=to_x {
        for lane in 0..CORRIDOR_WIDTH {
            grid.carve(Pos { y: y + lane, x });
        }
    }
}

fn carve_vertical_leg(grid: &mut Grid, x: i32, top_y: i32, bottom_y: i32) {
    let from_y = top_y.min(bottom_y);
    let to_y = top_y.max(bottom_y);
    for y in from_y..=to_y {
        for lane in 0..CORRIDOR_WIDTH {
            grid.carve(Pos { y, x: x + lane });
        }
    }
}
