//! Doorway detection on room perimeters.
//!
//! Every floor cell on the one-cell ring around a room (corners included) is a
//! candidate, and corridor cells always count, so sealing every door closes the room.
//! A ring cell that lies inside another room only counts when it sits in a
//! corridor mouth: walking along the edge from it, a wall shows up within two steps
//! on at least one side. Touching room interiors therefore do not register as doors.

use crate::types::{Pos, TileKind};

use super::grid::Grid;
use super::model::RoomRect;

const MOUTH_SCAN_STEPS: i32 = 2;

pub(super) fn detect_doors(grid: &Grid, rect: &RoomRect, rooms: &[RoomRect]) -> Vec<Pos> {
    let left = rect.x as i32;
    let top = rect.y as i32;
    let right = rect.right() as i32;
    let bottom = rect.bottom() as i32;
    let is_door = |cell: Pos, along: (i32, i32)| {
        if !grid.is_floor(cell) {
            return false;
        }
        let inside_other_room = rooms.iter().any(|other| other != rect && other.contains(cell));
        !inside_other_room || is_corridor_mouth(grid, cell, along)
    };

    let mut doors = Vec::new();
    for x in (left - 1)..=(right + 1) {
        for y in [top - 1, bottom + 1] {
            let cell = Pos { y, x };
            if is_door(cell, (1, 0)) {
                doors.push(cell);
            }
        }
    }
    for y in top..=bottom {
        for x in [left - 1, right + 1] {
            let cell = Pos { y, x };
            if is_door(cell, (0, 1)) {
                doors.push(cell);
            }
        }
    }

    doors.sort();
    doors.dedup();
    doors
}

/// `along` is the unit step parallel to the edge being scanned.
fn is_corridor_mouth(grid: &Grid, cell: Pos, along: (i32, i32)) -> bool {
    let wall_within_reach = |direction: i32| {
        (1..=MOUTH_SCAN_STEPS).any(|step| {
            let reach = step * direction;
            let probe = Pos { y: cell.y + along.1 * reach, x: cell.x + along.0 * reach };
            grid.tile_at(probe) == TileKind::Wall
        })
    };
    wall_within_reach(1) || wall_within_reach(-1)
}
