//! Events a floor session hands to its host each tick.

use serde::Serialize;

use crate::types::{Archetype, EnemyId, Pos, RoomId, StructureId, TargetRef, Vec2};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FloorEvent {
    RoomActivated { room: RoomId, enemy_count: usize },
    RoomCleared { room: RoomId },
    DoorsSealed { room: RoomId, doors: Vec<Pos> },
    DoorsOpened { room: RoomId, doors: Vec<Pos> },
    /// Floor cells hidden while the player is locked inside `room`.
    FogApplied { room: RoomId, cells: Vec<Pos> },
    FogCleared { room: RoomId },
    SpawnTelegraph { room: RoomId, position: Vec2, archetype: Archetype, duration_ms: u32 },
    EnemySpawned { enemy: EnemyId, room: RoomId, position: Vec2, archetype: Archetype },
    EnemyAttack { enemy: EnemyId, attacker_position: Vec2, target: TargetRef },
    DamageApplied { target: DamageTarget, position: Vec2, amount: i32, is_critical: bool },
    EnemyDeath { enemy: EnemyId, position: Vec2, xp_value: u32, archetype: Archetype },
    AuraPulse { enemy: EnemyId, position: Vec2, radius: f32, damage: i32 },
    BossPhaseChanged { enemy: EnemyId, phase: u8 },
    DamageReflected { enemy: EnemyId, amount: i32 },
    StructureDestroyed { structure: StructureId, position: Vec2 },
}

/// Who received a `DamageApplied` hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageTarget {
    Player,
    Enemy(EnemyId),
    Structure(StructureId),
}

impl FloorEvent {
    pub fn room(&self) -> Option<RoomId> {
        match self {
            FloorEvent::RoomActivated { room, .. }
            | FloorEvent::RoomCleared { room }
            | FloorEvent::DoorsSealed { room, .. }
            | FloorEvent::DoorsOpened { room, .. }
            | FloorEvent::FogApplied { room, .. }
            | FloorEvent::FogCleared { room }
            | FloorEvent::SpawnTelegraph { room, .. }
            | FloorEvent::EnemySpawned { room, .. } => Some(*room),
            _ => None,
        }
    }
}
