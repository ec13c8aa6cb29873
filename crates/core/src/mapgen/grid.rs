//! Geometry grid: the floor/wall substrate every other component reads.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{Pos, TileKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
}

impl Grid {
    pub fn filled(width: usize, height: usize, tile: TileKind) -> Self {
        Self { width, height, tiles: vec![tile; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tiles(&self) -> &[TileKind] {
        &self.tiles
    }

    /// Row-major view, `rows()[y][x]`.
    pub fn rows(&self) -> impl Iterator<Item = &[TileKind]> {
        self.tiles.chunks(self.width)
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Out-of-bounds cells read as `Wall`.
    pub fn tile_at(&self, pos: Pos) -> TileKind {
        if !self.in_bounds(pos) {
            return TileKind::Wall;
        }
        self.tiles[self.index(pos)]
    }

    pub fn is_floor(&self, pos: Pos) -> bool {
        self.tile_at(pos) == TileKind::Floor
    }

    pub fn floor_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.tiles.iter().enumerate().filter(|(_, tile)| **tile == TileKind::Floor).map(
            |(index, _)| Pos { y: (index / self.width) as i32, x: (index % self.width) as i32 },
        )
    }

    pub fn floor_count(&self) -> usize {
        self.tiles.iter().filter(|tile| **tile == TileKind::Floor).count()
    }

    /// Number of floor cells reachable from `start` with 4-directional floor-only moves.
    pub fn reachable_floor_count(&self, start: Pos) -> usize {
        if !self.is_floor(start) {
            return 0;
        }

        let mut seen = vec![false; self.tiles.len()];
        let mut open = VecDeque::from([start]);
        seen[self.index(start)] = true;
        let mut count = 0;

        while let Some(pos) = open.pop_front() {
            count += 1;
            for next in [
                Pos { y: pos.y - 1, x: pos.x },
                Pos { y: pos.y, x: pos.x + 1 },
                Pos { y: pos.y + 1, x: pos.x },
                Pos { y: pos.y, x: pos.x - 1 },
            ] {
                if !self.is_floor(next) {
                    continue;
                }
                let index = self.index(next);
                if seen[index] {
                    continue;
                }
                seen[index] = true;
                open.push_back(next);
            }
        }

        count
    }

    /// Writes stay inside the one-cell wall border.
    pub(super) fn carve(&mut self, pos: Pos) {
        if pos.x <= 0 || pos.y <= 0 {
            return;
        }
        if (pos.x as usize) >= self.width - 1 || (pos.y as usize) >= self.height - 1 {
            return;
        }
        let index = self.index(pos);
        self.tiles[index] = TileKind::Floor;
    }

    fn index(&self, pos: Pos) -> usize {
        (pos.y as usize) * self.width + (pos.x as usize)
    }
}
