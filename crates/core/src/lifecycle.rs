//! Room lifecycle: `Unvisited -> Active -> Cleared`, door seals and fog of war.
//!
//! The manager owns every room's state. Other components only drive it through
//! `activate`, `clear_peaceful` and `on_enemy_killed`; any request that is not the
//! single legal transition for the room's current state is ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use tracing::{debug, info};

use crate::events::FloorEvent;
use crate::mapgen::{GeneratedFloor, Room};
use crate::types::{Pos, RoomId, RoomKind, RoomState, Vec2};

/// Tiles the player must be inside a room's edge before it activates.
pub const ACTIVATION_MARGIN: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct RoomLifecycle {
    rooms: Vec<Room>,
    floor_cells: Vec<Pos>,
    states: BTreeMap<RoomId, RoomState>,
    current_room: Option<RoomId>,
    active_room: Option<RoomId>,
    sealed_doors: BTreeSet<Pos>,
    fogged: BTreeSet<Pos>,
    events: Vec<FloorEvent>,
}

impl RoomLifecycle {
    pub fn new(floor: &GeneratedFloor) -> Self {
        let states = floor
            .rooms
            .iter()
            .map(|room| {
                let state = if room.kind == RoomKind::Spawn {
                    RoomState::Cleared
                } else {
                    RoomState::Unvisited
                };
                (room.id, state)
            })
            .collect();
        Self {
            rooms: floor.rooms.clone(),
            floor_cells: floor.grid.floor_cells().collect(),
            states,
            current_room: None,
            active_room: None,
            sealed_doors: BTreeSet::new(),
            fogged: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Feeds the player's position; returns a room the player just stepped into
    /// that has never been visited.
    pub fn update(&mut self, player: Vec2) -> Option<Room> {
        let entered = self
            .rooms
            .iter()
            .find(|room| room.rect.contains_point_with_margin(player, ACTIVATION_MARGIN))
            .map(|room| room.id);
        if self.active_room.is_some_and(|active| entered != Some(active)) {
            return None;
        }
        if entered == self.current_room {
            return None;
        }
        self.current_room = entered;

        let room_id = entered?;
        if self.room_state_of(room_id) != Some(RoomState::Unvisited) {
            return None;
        }
        debug!(room = room_id.0, "player entered unvisited room");
        self.room(room_id).cloned()
    }

    /// Locks the player in with `enemy_count` enemies. Only one room is active at a time.
    pub fn activate(&mut self, room_id: RoomId, enemy_count: usize) -> bool {
        if self.active_room.is_some() || self.room_state_of(room_id) != Some(RoomState::Unvisited)
        {
            return false;
        }
        let Some(room) = self.rooms.iter().find(|room| room.id == room_id) else {
            return false;
        };
        let doors = room.doors.clone();
        let rect = room.rect;

        self.states.insert(room_id, RoomState::Active);
        self.active_room = Some(room_id);
        self.sealed_doors.extend(doors.iter().copied());
        self.fogged = self
            .floor_cells
            .iter()
            .copied()
            .filter(|cell| !rect.contains(*cell) && !doors.contains(cell))
            .collect();

        info!(room = room_id.0, enemy_count, doors = doors.len(), "room activated");
        self.events.push(FloorEvent::RoomActivated { room: room_id, enemy_count });
        self.events.push(FloorEvent::DoorsSealed { room: room_id, doors });
        self.events.push(FloorEvent::FogApplied {
            room: room_id,
            cells: self.fogged.iter().copied().collect(),
        });

        if enemy_count == 0 {
            self.on_enemy_killed(0);
        }
        true
    }

    /// Peaceful rooms skip straight to `Cleared` with no seal.
    pub fn clear_peaceful(&mut self, room_id: RoomId) -> bool {
        let peaceful = self.room(room_id).is_some_and(|room| room.kind.is_peaceful());
        if !peaceful || self.room_state_of(room_id) != Some(RoomState::Unvisited) {
            return false;
        }
        self.states.insert(room_id, RoomState::Cleared);
        debug!(room = room_id.0, "peaceful room cleared on entry");
        self.events.push(FloorEvent::RoomCleared { room: room_id });
        true
    }

    /// Reports a death in the active room; clears it once nothing is left alive.
    pub fn on_enemy_killed(&mut self, remaining: usize) -> Option<RoomId> {
        if remaining > 0 {
            return None;
        }
        let room_id = self.active_room?;
        if self.room_state_of(room_id) != Some(RoomState::Active) {
            return None;
        }

        self.states.insert(room_id, RoomState::Cleared);
        self.active_room = None;
        let doors = self.room(room_id).map(|room| room.doors.clone()).unwrap_or_default();
        for door in &doors {
            self.sealed_doors.remove(door);
        }
        self.fogged.clear();

        info!(room = room_id.0, "room cleared");
        self.events.push(FloorEvent::RoomCleared { room: room_id });
        self.events.push(FloorEvent::DoorsOpened { room: room_id, doors });
        self.events.push(FloorEvent::FogCleared { room: room_id });
        Some(room_id)
    }

    pub fn room_state_of(&self, room_id: RoomId) -> Option<RoomState> {
        self.states.get(&room_id).copied()
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == room_id)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn active_room(&self) -> Option<RoomId> {
        self.active_room
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.current_room
    }

    pub fn is_door_sealed(&self, pos: Pos) -> bool {
        self.sealed_doors.contains(&pos)
    }

    pub fn sealed_doors(&self) -> impl Iterator<Item = Pos> + '_ {
        self.sealed_doors.iter().copied()
    }

    pub fn is_fogged(&self, pos: Pos) -> bool {
        self.fogged.contains(&pos)
    }

    pub fn cleared_count(&self) -> usize {
        self.states.values().filter(|state| **state == RoomState::Cleared).count()
    }

    pub fn drain_events(&mut self) -> Vec<FloorEvent> {
        mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::{self, RoomRect};

    fn floor() -> GeneratedFloor {
        mapgen::generate(60, 45, Some("lifecycle")).expect("valid dimensions")
    }

    fn interior_point(rect: RoomRect) -> Vec2 {
        rect.center().center()
    }

    fn second_room(floor: &GeneratedFloor) -> Room {
        floor.rooms[1].clone()
    }

    #[test]
    fn spawn_room_starts_cleared_and_others_unvisited() {
        let floor = floor();
        let lifecycle = RoomLifecycle::new(&floor);
        for room in &floor.rooms {
            let expected = if room.kind == RoomKind::Spawn {
                RoomState::Cleared
            } else {
                RoomState::Unvisited
            };
            assert_eq!(lifecycle.room_state_of(room.id), Some(expected));
        }
        assert_eq!(lifecycle.room_state_of(RoomId(999)), None);
    }

    #[test]
    fn entering_along_the_edge_does_not_trigger() {
        let floor = floor();
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);

        let edge = Vec2::new(room.rect.x as f32 + 0.5, interior_point(room.rect).y);
        assert_eq!(lifecycle.update(edge), None);

        let entered = lifecycle.update(interior_point(room.rect)).expect("deep entry triggers");
        assert_eq!(entered.id, room.id);
        assert_eq!(lifecycle.update(interior_point(room.rect)), None, "no re-trigger in place");
    }

    #[test]
    fn activation_seals_doors_and_fogs_everything_outside() {
        let floor = floor();
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);

        assert!(lifecycle.activate(room.id, 3));
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Active));
        for door in &room.doors {
            assert!(lifecycle.is_door_sealed(*door));
        }
        assert!(!lifecycle.is_fogged(room.center));
        let outside = floor.grid.floor_cells().find(|cell| {
            !room.rect.contains(*cell) && !room.doors.contains(cell)
        });
        assert!(outside.is_some_and(|cell| lifecycle.is_fogged(cell)));

        let events = lifecycle.drain_events();
        assert!(matches!(
            events.first(),
            Some(FloorEvent::RoomActivated { enemy_count: 3, .. })
        ));
        assert!(!lifecycle.activate(room.id, 3), "double activation is ignored");
        assert!(lifecycle.drain_events().is_empty());
    }

    #[test]
    fn room_clears_exactly_when_remaining_reaches_zero() {
        let floor = floor();
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);
        lifecycle.activate(room.id, 3);
        lifecycle.drain_events();

        assert_eq!(lifecycle.on_enemy_killed(2), None);
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Active));
        assert_eq!(lifecycle.on_enemy_killed(0), Some(room.id));
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Cleared));
        assert_eq!(lifecycle.on_enemy_killed(0), None);

        let events = lifecycle.drain_events();
        let opened = events
            .iter()
            .filter(|event| matches!(event, FloorEvent::DoorsOpened { .. }))
            .count();
        assert_eq!(opened, 1);
        assert!(lifecycle.sealed_doors().next().is_none());
        assert!(!lifecycle.is_fogged(floor.spawn_point));
    }

    #[test]
    fn cleared_rooms_never_reactivate() {
        let floor = floor();
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);
        lifecycle.activate(room.id, 1);
        lifecycle.on_enemy_killed(0);

        assert_eq!(lifecycle.update(floor.spawn_point.center()), None);
        assert_eq!(lifecycle.update(interior_point(room.rect)), None);
        assert!(!lifecycle.activate(room.id, 2));
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Cleared));
    }

    #[test]
    fn other_rooms_wait_until_the_active_room_clears() {
        let floor = floor();
        let first = second_room(&floor);
        let next = floor.rooms.last().expect("exit room").clone();
        let mut lifecycle = RoomLifecycle::new(&floor);

        assert!(lifecycle.update(interior_point(first.rect)).is_some());
        lifecycle.activate(first.id, 2);
        assert_eq!(lifecycle.update(interior_point(next.rect)), None);
        assert!(!lifecycle.activate(next.id, 2));
        assert_eq!(lifecycle.room_state_of(next.id), Some(RoomState::Unvisited));

        lifecycle.on_enemy_killed(0);
        let entered = lifecycle.update(interior_point(next.rect)).expect("now free to trigger");
        assert_eq!(entered.id, next.id);
    }

    #[test]
    fn kill_reports_without_an_active_room_are_ignored() {
        let floor = floor();
        let mut lifecycle = RoomLifecycle::new(&floor);
        assert_eq!(lifecycle.on_enemy_killed(0), None);
        assert!(lifecycle.drain_events().is_empty());
    }

    #[test]
    fn empty_activation_clears_immediately() {
        let floor = floor();
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);
        assert!(lifecycle.activate(room.id, 0));
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Cleared));
        assert_eq!(lifecycle.active_room(), None);
    }

    #[test]
    fn peaceful_rooms_clear_on_entry_without_sealing() {
        let mut floor = floor();
        floor.rooms[1].kind = RoomKind::Treasure;
        let room = second_room(&floor);
        let mut lifecycle = RoomLifecycle::new(&floor);

        assert!(lifecycle.clear_peaceful(room.id));
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Cleared));
        assert!(lifecycle.sealed_doors().next().is_none());
        assert_eq!(lifecycle.drain_events(), vec![FloorEvent::RoomCleared { room: room.id }]);

        let combat_room = floor.rooms.last().expect("exit room").id;
        assert!(!lifecycle.clear_peaceful(combat_room));
    }
}
