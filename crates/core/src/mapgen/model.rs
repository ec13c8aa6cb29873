//! Public data models for generated floors and their rooms.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::types::{Pos, RoomId, RoomKind, TileKind, Vec2};

use super::grid::Grid;
use super::seed::GenerationSeed;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl RoomRect {
    pub fn right(self) -> usize {
        self.x + self.width - 1
    }

    pub fn bottom(self) -> usize {
        self.y + self.height - 1
    }

    pub fn area(self) -> usize {
        self.width * self.height
    }

    pub fn center(self) -> Pos {
        Pos { y: (self.y + (self.height / 2)) as i32, x: (self.x + (self.width / 2)) as i32 }
    }

    pub fn expanded(self, margin: usize) -> Self {
        let expanded_x = self.x.saturating_sub(margin);
        let expanded_y = self.y.saturating_sub(margin);
        let expanded_right = self.right().saturating_add(margin);
        let expanded_bottom = self.bottom().saturating_add(margin);
        Self {
            x: expanded_x,
            y: expanded_y,
            width: expanded_right - expanded_x + 1,
            height: expanded_bottom - expanded_y + 1,
        }
    }

    /// Rectangle shrunk by `margin` on every side, if anything is left.
    pub fn inset(self, margin: usize) -> Option<Self> {
        if self.width <= margin * 2 || self.height <= margin * 2 {
            return None;
        }
        Some(Self {
            x: self.x + margin,
            y: self.y + margin,
            width: self.width - margin * 2,
            height: self.height - margin * 2,
        })
    }

    pub fn intersects(self, other: &Self) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    pub fn contains(self, pos: Pos) -> bool {
        if pos.x < 0 || pos.y < 0 {
            return false;
        }
        let px = pos.x as usize;
        let py = pos.y as usize;
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Continuous-space containment with `margin` tiles kept clear of every edge.
    pub fn contains_point_with_margin(self, point: Vec2, margin: f32) -> bool {
        let left = self.x as f32 + margin;
        let top = self.y as f32 + margin;
        let right = (self.x + self.width) as f32 - margin;
        let bottom = (self.y + self.height) as f32 - margin;
        point.x >= left && point.x < right && point.y >= top && point.y < bottom
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub rect: RoomRect,
    pub center: Pos,
    pub kind: RoomKind,
    pub doors: Vec<Pos>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFloor {
    pub seed: GenerationSeed,
    pub grid: Grid,
    pub rooms: Vec<Room>,
    pub spawn_point: Pos,
    pub exit_point: Pos,
}

impl GeneratedFloor {
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn exit_room(&self) -> Option<&Room> {
        self.rooms.iter().find(|room| room.kind == RoomKind::Exit)
    }

    pub fn room_containing(&self, pos: Pos) -> Option<&Room> {
        self.rooms.iter().find(|room| room.rect.contains(pos))
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(self.seed.0.to_le_bytes());
        bytes.extend((self.grid.width() as u32).to_le_bytes());
        bytes.extend((self.grid.height() as u32).to_le_bytes());
        for tile in self.grid.tiles() {
            bytes.push(match tile {
                TileKind::Wall => 0,
                TileKind::Floor => 1,
            });
        }

        bytes.extend((self.rooms.len() as u32).to_le_bytes());
        for room in &self.rooms {
            bytes.extend(room.id.0.to_le_bytes());
            for value in [room.rect.x, room.rect.y, room.rect.width, room.rect.height] {
                bytes.extend((value as u32).to_le_bytes());
            }
            bytes.push(match room.kind {
                RoomKind::Normal => 0,
                RoomKind::Spawn => 1,
                RoomKind::Exit => 2,
                RoomKind::Treasure => 3,
                RoomKind::Trap => 4,
                RoomKind::Shrine => 5,
                RoomKind::Challenge => 6,
            });
            bytes.extend((room.doors.len() as u32).to_le_bytes());
            for door in &room.doors {
                bytes.extend(door.y.to_le_bytes());
                bytes.extend(door.x.to_le_bytes());
            }
        }

        bytes.extend(self.spawn_point.y.to_le_bytes());
        bytes.extend(self.spawn_point.x.to_le_bytes());
        bytes.extend(self.exit_point.y.to_le_bytes());
        bytes.extend(self.exit_point.x.to_le_bytes());
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_collapses_for_thin_rooms() {
        let rect = RoomRect { x: 2, y: 3, width: 4, height: 9 };
        assert_eq!(rect.inset(2), None);
        assert_eq!(rect.inset(1), Some(RoomRect { x: 3, y: 4, width: 2, height: 7 }));
    }

    #[test]
    fn margin_containment_excludes_the_outer_ring() {
        let rect = RoomRect { x: 10, y: 10, width: 6, height: 6 };
        assert!(rect.contains_point_with_margin(Vec2::new(13.0, 13.0), 1.0));
        assert!(rect.contains_point_with_margin(Vec2::new(11.0, 14.9), 1.0));
        assert!(!rect.contains_point_with_margin(Vec2::new(10.5, 13.0), 1.0));
        assert!(!rect.contains_point_with_margin(Vec2::new(13.0, 15.2), 1.0));
        assert!(rect.contains_point_with_margin(Vec2::new(10.5, 13.0), 0.0));
    }
}
