//! Encounter planning: how many enemies a room gets, which archetypes, and where.

use rand_chacha::rand_core::Rng;
use tracing::debug;

use crate::content::{ArchetypeProfile, archetype_profile, boss_for_theme, themed_primary};
use crate::events::FloorEvent;
use crate::lifecycle::RoomLifecycle;
use crate::mapgen::seed::{random_unit, random_usize};
use crate::mapgen::{Room, RoomRect};
use crate::progression::{
    CHALLENGE_DEPTH_BOOST, challenge_filler, enemy_count, minimum_depth, scale_to_depth,
};
use crate::schedule::{ScheduledTask, Scheduler};
use crate::types::{Archetype, RoomId, RoomKind, Theme, Vec2};

/// Spawn points keep this many tiles clear of the room edge.
pub const SPAWN_INSET: usize = 2;
pub const TELEGRAPH_MS: u32 = 1_200;

const FILLER: Archetype = Archetype::Grunt;
const SECONDARY_POOL: [Archetype; 3] = [Archetype::Skitter, Archetype::Brute, Archetype::Archer];

// Unthemed table, cumulative out of 100.
const GRUNT_ROLL: usize = 50;
const SKITTER_ROLL: usize = 75;
const BRUTE_ROLL: usize = 90;

// Themed table, cumulative out of 100.
const THEMED_PRIMARY_ROLL: usize = 60;
const THEMED_SECONDARY_ROLL: usize = 85;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnEntry {
    pub position: Vec2,
    pub archetype: Archetype,
    pub profile: ArchetypeProfile,
}

/// Positions and archetypes for one room activation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnPlan {
    pub entries: Vec<SpawnEntry>,
}

impl SpawnPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncounterSpawner {
    pub depth: u32,
    pub theme: Option<Theme>,
    pub boss_room: Option<RoomId>,
    pub telegraph_ms: u32,
}

impl EncounterSpawner {
    pub fn new(depth: u32, theme: Option<Theme>, boss_room: Option<RoomId>) -> Self {
        Self { depth, theme, boss_room, telegraph_ms: TELEGRAPH_MS }
    }

    pub fn is_boss_room(&self, room: &Room) -> bool {
        self.boss_room == Some(room.id)
    }

    pub fn plan_encounter(&self, rng: &mut impl Rng, room: &Room) -> SpawnPlan {
        let is_boss = self.is_boss_room(room);
        let count = enemy_count(room.kind, room.rect, self.depth, is_boss);
        if count == 0 {
            return SpawnPlan::default();
        }

        if is_boss {
            let archetype = boss_for_theme(self.theme);
            let profile = scale_to_depth(archetype_profile(archetype), self.depth);
            let position = room.center.center();
            return SpawnPlan { entries: vec![SpawnEntry { position, archetype, profile }] };
        }

        let challenge = room.kind == RoomKind::Challenge;
        let depth = if challenge { self.depth + CHALLENGE_DEPTH_BOOST } else { self.depth };
        let positions = spawn_positions(rng, room.rect, count);
        let entries = positions
            .into_iter()
            .map(|position| {
                let archetype = roll_archetype(rng, depth, self.theme);
                let mut profile = scale_to_depth(archetype_profile(archetype), depth);
                if challenge && archetype == FILLER {
                    profile = challenge_filler(profile);
                }
                SpawnEntry { position, archetype, profile }
            })
            .collect();
        SpawnPlan { entries }
    }

    /// Seals `room`, telegraphs each spawn point and schedules the wave.
    ///
    /// Peaceful rooms are cleared instead. Returns the number of enemies on the way.
    pub fn spawn_encounter(
        &self,
        rng: &mut impl Rng,
        room: &Room,
        now_ms: u64,
        lifecycle: &mut RoomLifecycle,
        scheduler: &mut Scheduler,
        events: &mut Vec<FloorEvent>,
    ) -> usize {
        if room.kind.is_peaceful() && !self.is_boss_room(room) {
            lifecycle.clear_peaceful(room.id);
            return 0;
        }

        let plan = self.plan_encounter(rng, room);
        let count = plan.len();
        if !lifecycle.activate(room.id, count) {
            return 0;
        }
        if plan.is_empty() {
            return 0;
        }

        debug!(
            room = room.id.0,
            kind = ?room.kind,
            count,
            boss = self.is_boss_room(room),
            "encounter planned"
        );
        for entry in &plan.entries {
            events.push(FloorEvent::SpawnTelegraph {
                room: room.id,
                position: entry.position,
                archetype: entry.archetype,
                duration_ms: self.telegraph_ms,
            });
        }
        scheduler.schedule(
            now_ms + u64::from(self.telegraph_ms),
            ScheduledTask::SpawnWave { room: room.id, plan },
        );
        count
    }
}

/// Uniform points inside `rect` shrunk by `SPAWN_INSET`; rooms too small for the
/// inset put everyone on the center cell.
pub fn spawn_positions(rng: &mut impl Rng, rect: RoomRect, count: usize) -> Vec<Vec2> {
    let Some(area) = rect.inset(SPAWN_INSET) else {
        return vec![rect.center().center(); count];
    };
    (0..count)
        .map(|_| {
            let x = area.x as f32 + random_unit(rng) as f32 * area.width as f32;
            let y = area.y as f32 + random_unit(rng) as f32 * area.height as f32;
            Vec2::new(x, y)
        })
        .collect()
}

pub fn roll_archetype(rng: &mut impl Rng, depth: u32, theme: Option<Theme>) -> Archetype {
    let roll = random_usize(rng, 0, 99);
    match theme {
        None => gate(unthemed_archetype(roll), depth),
        Some(theme) => {
            if roll < THEMED_PRIMARY_ROLL {
                themed_primary(theme)
            } else if roll < THEMED_SECONDARY_ROLL {
                let eligible: Vec<Archetype> = SECONDARY_POOL
                    .into_iter()
                    .filter(|archetype| minimum_depth(*archetype) <= depth)
                    .collect();
                match eligible.len() {
                    0 => FILLER,
                    len => eligible[random_usize(rng, 0, len - 1)],
                }
            } else {
                FILLER
            }
        }
    }
}

fn unthemed_archetype(roll: usize) -> Archetype {
    if roll < GRUNT_ROLL {
        Archetype::Grunt
    } else if roll < SKITTER_ROLL {
        Archetype::Skitter
    } else if roll < BRUTE_ROLL {
        Archetype::Brute
    } else {
        Archetype::Archer
    }
}

fn gate(archetype: Archetype, depth: u32) -> Archetype {
    if minimum_depth(archetype) <= depth { archetype } else { FILLER }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::content::Behavior;
    use crate::mapgen::{self, GenerationSeed};
    use crate::types::{Pos, RoomState};

    fn room(kind: RoomKind, width: usize, height: usize) -> Room {
        let rect = RoomRect { x: 4, y: 4, width, height };
        Room { id: RoomId(1), rect, center: rect.center(), kind, doors: vec![Pos { y: 3, x: 6 }] }
    }

    fn tally(depth: u32, theme: Option<Theme>) -> BTreeMap<Archetype, usize> {
        let mut rng = GenerationSeed(u64::from(depth) * 31 + 7).rng();
        let mut counts = BTreeMap::new();
        for _ in 0..10_000 {
            *counts.entry(roll_archetype(&mut rng, depth, theme)).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn spawn_points_stay_inside_the_inset() {
        let mut rng = GenerationSeed(3).rng();
        let rect = RoomRect { x: 10, y: 5, width: 12, height: 8 };
        for point in spawn_positions(&mut rng, rect, 64) {
            assert!(point.x >= 12.0 && point.x < 20.0, "{point:?}");
            assert!(point.y >= 7.0 && point.y < 11.0, "{point:?}");
        }
    }

    #[test]
    fn tiny_rooms_clamp_spawns_to_center() {
        let mut rng = GenerationSeed(3).rng();
        let rect = RoomRect { x: 2, y: 2, width: 4, height: 3 };
        let points = spawn_positions(&mut rng, rect, 3);
        assert_eq!(points, vec![rect.center().center(); 3]);
    }

    #[test]
    fn shallow_floors_never_roll_gated_archetypes() {
        let counts = tally(1, None);
        assert!(!counts.contains_key(&Archetype::Brute));
        assert!(!counts.contains_key(&Archetype::Archer));
        assert!(counts[&Archetype::Grunt] > counts[&Archetype::Skitter]);

        let deep = tally(4, None);
        assert!(deep.contains_key(&Archetype::Brute));
        assert!(deep.contains_key(&Archetype::Archer));
    }

    #[test]
    fn themed_primary_takes_about_sixty_percent() {
        let counts = tally(3, Some(Theme::Wrath));
        let primary = counts[&Archetype::WrathFiend];
        assert!((5_600..6_400).contains(&primary), "primary share {primary}");
        assert!(counts.contains_key(&Archetype::Grunt));
        assert!(!counts.contains_key(&Archetype::PrideHusk));
    }

    #[test]
    fn boss_room_gets_a_single_themed_boss_at_center() {
        let spawner = EncounterSpawner::new(5, Some(Theme::Greed), Some(RoomId(1)));
        let room = room(RoomKind::Exit, 14, 14);
        let plan = spawner.plan_encounter(&mut GenerationSeed(1).rng(), &room);
        assert_eq!(plan.len(), 1);
        let boss = plan.entries[0];
        assert_eq!(boss.archetype, Archetype::GreedKing);
        assert_eq!(boss.profile.behavior, Behavior::Boss);
        assert_eq!(boss.position, room.center.center());
        assert!(boss.profile.hp > archetype_profile(Archetype::GreedKing).hp);
    }

    #[test]
    fn challenge_rooms_boost_filler_and_count() {
        let spawner = EncounterSpawner::new(1, None, None);
        let room = room(RoomKind::Challenge, 10, 10);
        let plan = spawner.plan_encounter(&mut GenerationSeed(9).rng(), &room);
        assert_eq!(plan.len(), 2);

        let depth = 1 + CHALLENGE_DEPTH_BOOST;
        let boosted = challenge_filler(scale_to_depth(archetype_profile(Archetype::Grunt), depth));
        for _ in 0..20 {
            for entry in spawner.plan_encounter(&mut GenerationSeed(9).rng(), &room).entries {
                if entry.archetype == Archetype::Grunt {
                    assert_eq!(entry.profile, boosted);
                }
            }
        }
    }

    #[test]
    fn same_rng_state_gives_the_same_plan() {
        let spawner = EncounterSpawner::new(4, Some(Theme::Sloth), None);
        let room = room(RoomKind::Normal, 16, 12);
        let a = spawner.plan_encounter(&mut GenerationSeed(77).rng(), &room);
        let b = spawner.plan_encounter(&mut GenerationSeed(77).rng(), &room);
        assert_eq!(a, b);
        assert_eq!(a.len(), enemy_count(RoomKind::Normal, room.rect, 4, false));
    }

    #[test]
    fn spawning_seals_the_room_telegraphs_and_schedules_the_wave() {
        let floor = mapgen::generate(60, 45, Some("spawner")).expect("valid dimensions");
        let mut room = floor.rooms[1].clone();
        room.kind = RoomKind::Normal;
        let mut lifecycle = RoomLifecycle::new(&floor);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();
        let spawner = EncounterSpawner::new(2, None, None);

        let count = spawner.spawn_encounter(
            &mut GenerationSeed(4).rng(),
            &room,
            1_000,
            &mut lifecycle,
            &mut scheduler,
            &mut events,
        );
        assert!(count >= 1);
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Active));
        assert_eq!(events.len(), count);
        assert!(events.iter().all(|event| matches!(event, FloorEvent::SpawnTelegraph { .. })));
        assert!(scheduler.drain_due(2_199).is_empty());
        let due = scheduler.drain_due(2_200);
        assert!(matches!(
            due.as_slice(),
            [ScheduledTask::SpawnWave { plan, .. }] if plan.len() == count
        ));
    }

    #[test]
    fn peaceful_rooms_are_cleared_instead_of_populated() {
        let mut floor = mapgen::generate(60, 45, Some("spawner")).expect("valid dimensions");
        floor.rooms[1].kind = RoomKind::Shrine;
        let room = floor.rooms[1].clone();
        let mut lifecycle = RoomLifecycle::new(&floor);
        let mut scheduler = Scheduler::new();
        let mut events = Vec::new();

        let count = EncounterSpawner::new(3, None, None).spawn_encounter(
            &mut GenerationSeed(4).rng(),
            &room,
            0,
            &mut lifecycle,
            &mut scheduler,
            &mut events,
        );
        assert_eq!(count, 0);
        assert_eq!(lifecycle.room_state_of(room.id), Some(RoomState::Cleared));
        assert!(scheduler.is_empty());
    }
}
