//! Floor-depth difficulty rules: encounter sizes, archetype gating, stat scaling.

use crate::content::ArchetypeProfile;
use crate::mapgen::RoomRect;
use crate::types::{Archetype, RoomKind};

pub const STARTING_DEPTH: u32 = 1;
pub const BOSS_FLOOR_INTERVAL: u32 = 5;
/// Extra depth challenge rooms roll their composition against.
pub const CHALLENGE_DEPTH_BOOST: u32 = 2;

const NORMAL_AREA_PER_ENEMY: usize = 150;
const NORMAL_MAX_ENEMIES: usize = 6;
const CHALLENGE_AREA_PER_ENEMY: usize = 100;
const CHALLENGE_MIN_ENEMIES: usize = 2;
const CHALLENGE_MAX_ENEMIES: usize = 8;

const HP_GROWTH_PER_DEPTH: f32 = 0.12;
const ATTACK_GROWTH_PER_DEPTH: f32 = 0.08;
const XP_GROWTH_PER_DEPTH: f32 = 0.10;
const DEPTHS_PER_DEFENSE_POINT: u32 = 4;

const CHALLENGE_FILLER_HP_MULTIPLIER: f32 = 1.5;
const CHALLENGE_FILLER_ATTACK_MULTIPLIER: f32 = 1.25;
const CHALLENGE_FILLER_XP_MULTIPLIER: f32 = 2.0;

pub fn is_boss_floor(depth: u32) -> bool {
    depth >= BOSS_FLOOR_INTERVAL && depth % BOSS_FLOOR_INTERVAL == 0
}

/// Number of enemies an activated room receives.
pub fn enemy_count(kind: RoomKind, rect: RoomRect, depth: u32, is_boss_room: bool) -> usize {
    if is_boss_room {
        return 1;
    }
    let depth = depth as usize;
    match kind {
        RoomKind::Spawn | RoomKind::Treasure | RoomKind::Shrine => 0,
        RoomKind::Challenge => ((rect.area() / CHALLENGE_AREA_PER_ENEMY).max(CHALLENGE_MIN_ENEMIES)
            + depth / 2)
            .clamp(CHALLENGE_MIN_ENEMIES, CHALLENGE_MAX_ENEMIES),
        RoomKind::Normal | RoomKind::Trap | RoomKind::Exit => {
            ((rect.area() / NORMAL_AREA_PER_ENEMY).max(1) + depth / 3).clamp(1, NORMAL_MAX_ENEMIES)
        }
    }
}

/// Shallowest depth at which an archetype may appear in the secondary pool.
pub fn minimum_depth(archetype: Archetype) -> u32 {
    match archetype {
        Archetype::Brute => 3,
        Archetype::Archer => 2,
        _ => STARTING_DEPTH,
    }
}

/// Profile with stats scaled to `depth`.
pub fn scale_to_depth(profile: ArchetypeProfile, depth: u32) -> ArchetypeProfile {
    let steps = depth.saturating_sub(STARTING_DEPTH);
    let growth = steps as f32;
    ArchetypeProfile {
        hp: scale(profile.hp, 1.0 + HP_GROWTH_PER_DEPTH * growth),
        attack: scale(profile.attack, 1.0 + ATTACK_GROWTH_PER_DEPTH * growth),
        defense: profile.defense + (steps / DEPTHS_PER_DEFENSE_POINT) as i32,
        xp_value: (profile.xp_value as f32 * (1.0 + XP_GROWTH_PER_DEPTH * growth)).round() as u32,
        ..profile
    }
}

/// Elevated filler used in challenge rooms.
pub fn challenge_filler(profile: ArchetypeProfile) -> ArchetypeProfile {
    ArchetypeProfile {
        hp: scale(profile.hp, CHALLENGE_FILLER_HP_MULTIPLIER),
        attack: scale(profile.attack, CHALLENGE_FILLER_ATTACK_MULTIPLIER),
        xp_value: (profile.xp_value as f32 * CHALLENGE_FILLER_XP_MULTIPLIER).round() as u32,
        ..profile
    }
}

fn scale(value: i32, multiplier: f32) -> i32 {
    ((value as f32) * multiplier).round().max(1.0) as i32
}
