pub mod agent;
pub mod combat;
pub mod config;
pub mod content;
pub mod events;
pub mod lifecycle;
pub mod mapgen;
pub mod progression;
pub mod schedule;
pub mod session;
pub mod spawner;
pub mod types;

pub use agent::{AgentAction, AgentIntent, DamageOutcome, EnemyAgent};
pub use combat::{CombatResult, CombatStats, resolve_attack};
pub use config::{ConfigError, FloorConfig, RoomCountRange};
pub use events::{DamageTarget, FloorEvent};
pub use lifecycle::RoomLifecycle;
pub use mapgen::{DungeonGenerator, GeneratedFloor, GenerationSeed, Grid, Room, RoomRect};
pub use session::{BasicPlayer, FloorContext, FloorSession, PlayerHandle, Structure};
pub use spawner::{EncounterSpawner, SpawnPlan};
pub use types::*;
