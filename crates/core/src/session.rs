//! Per-floor host loop.
//!
//! A `FloorSession` owns the generated floor, the room lifecycle, the enemy
//! collection and the pending task list. Each call to `tick` runs, in order:
//! lifecycle update, encounter spawning, agent updates with combat, enemy movement,
//! then due scheduled tasks. Waves that land in that last step therefore never act in
//! the tick they appear.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, info};

use crate::agent::{AgentAction, EnemyAgent};
use crate::combat::{CombatResult, CombatStats, resolve_attack};
use crate::config::{ConfigError, FloorConfig};
use crate::events::{DamageTarget, FloorEvent};
use crate::lifecycle::RoomLifecycle;
use crate::mapgen::seed::mix_seed;
use crate::mapgen::{DungeonGenerator, GeneratedFloor};
use crate::progression::is_boss_floor;
use crate::schedule::{ScheduledTask, Scheduler};
use crate::spawner::{EncounterSpawner, SpawnPlan};
use crate::types::{EnemyId, RoomId, StructureId, TargetRef, Theme, Vec2};

/// Knockback impulses last this long before a scheduled task zeroes them.
pub const KNOCKBACK_WINDOW_MS: u32 = 150;
/// Combat forces are expressed in pixels; movement runs in tiles.
pub const PIXELS_PER_TILE: f32 = 32.0;
/// Longest single movement step, so fast movers cannot skip over a wall cell.
const MAX_STEP_TILES: f32 = 0.25;
const GAMEPLAY_SEED_SALT: u64 = 0x5EED_F100_D0C0_0001;

/// The host's view of the player character.
pub trait PlayerHandle {
    fn position(&self) -> Vec2;
    fn hp(&self) -> i32;
    fn attack(&self) -> i32;
    fn defense(&self) -> i32;
    /// Applies a hit the core resolved against the player.
    fn receive_hit(&mut self, hit: &CombatResult);
}

/// Minimal player used by headless hosts and tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicPlayer {
    pub position: Vec2,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
}

impl PlayerHandle for BasicPlayer {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn hp(&self) -> i32 {
        self.hp
    }

    fn attack(&self) -> i32 {
        self.attack
    }

    fn defense(&self) -> i32 {
        self.defense
    }

    fn receive_hit(&mut self, hit: &CombatResult) {
        self.hp -= hit.damage;
    }
}

/// Destructible object enemies may target instead of the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub position: Vec2,
    pub hp: i32,
    pub defense: i32,
}

/// Floor-wide parameters fixed at floor start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorContext {
    pub depth: u32,
    pub theme: Option<Theme>,
    pub gameplay_seed: u64,
    pub boss_room: Option<RoomId>,
}

impl FloorContext {
    pub fn new(config: &FloorConfig, floor: &GeneratedFloor) -> Self {
        let depth = config.effective_depth();
        let boss_room = if is_boss_floor(depth) {
            floor.exit_room().map(|room| room.id)
        } else {
            None
        };
        Self {
            depth,
            theme: config.theme,
            gameplay_seed: mix_seed(floor.seed.0 ^ GAMEPLAY_SEED_SALT),
            boss_room,
        }
    }

    pub fn is_boss_floor(&self) -> bool {
        self.boss_room.is_some()
    }
}

pub struct FloorSession {
    floor: GeneratedFloor,
    context: FloorContext,
    lifecycle: RoomLifecycle,
    spawner: EncounterSpawner,
    scheduler: Scheduler,
    enemies: SlotMap<EnemyId, EnemyAgent>,
    structures: SlotMap<StructureId, Structure>,
    rng: ChaCha8Rng,
    now_ms: u64,
    ticks: u64,
}

impl FloorSession {
    pub fn new(floor: GeneratedFloor, context: FloorContext) -> Self {
        info!(
            seed = %floor.seed,
            depth = context.depth,
            theme = ?context.theme,
            boss_room = ?context.boss_room.map(|room| room.0),
            rooms = floor.rooms.len(),
            "floor session started"
        );
        Self {
            lifecycle: RoomLifecycle::new(&floor),
            spawner: EncounterSpawner::new(context.depth, context.theme, context.boss_room),
            scheduler: Scheduler::new(),
            enemies: SlotMap::with_key(),
            structures: SlotMap::with_key(),
            rng: ChaCha8Rng::seed_from_u64(context.gameplay_seed),
            now_ms: 0,
            ticks: 0,
            floor,
            context,
        }
    }

    /// Validates `config`, generates its floor and starts a session on it.
    pub fn from_config(config: &FloorConfig) -> Result<Self, ConfigError> {
        let floor = DungeonGenerator::new(config.clone())?.generate();
        let context = FloorContext::new(config, &floor);
        Ok(Self::new(floor, context))
    }

    pub fn floor(&self) -> &GeneratedFloor {
        &self.floor
    }

    pub fn context(&self) -> &FloorContext {
        &self.context
    }

    pub fn lifecycle(&self) -> &RoomLifecycle {
        &self.lifecycle
    }

    pub fn enemies(&self) -> impl Iterator<Item = (EnemyId, &EnemyAgent)> {
        self.enemies.iter()
    }

    pub fn enemy(&self, id: EnemyId) -> Option<&EnemyAgent> {
        self.enemies.get(id)
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn structures(&self) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.structures.iter()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether a body may stand at `point`: on floor and not on a sealed door.
    pub fn can_occupy(&self, point: Vec2) -> bool {
        let cell = point.cell();
        self.floor.grid.is_floor(cell) && !self.lifecycle.is_door_sealed(cell)
    }

    pub fn add_structure(&mut self, position: Vec2, hp: i32, defense: i32) -> StructureId {
        self.structures.insert(Structure { position, hp: hp.max(1), defense })
    }

    /// Advances the floor by `elapsed_ms` and returns everything the host must react to.
    pub fn tick(&mut self, elapsed_ms: u32, player: &mut impl PlayerHandle) -> Vec<FloorEvent> {
        self.now_ms += u64::from(elapsed_ms);
        self.ticks += 1;
        let mut events = Vec::new();

        if let Some(room) = self.lifecycle.update(player.position()) {
            let mut telegraphs = Vec::new();
            self.spawner.spawn_encounter(
                &mut self.rng,
                &room,
                self.now_ms,
                &mut self.lifecycle,
                &mut self.scheduler,
                &mut telegraphs,
            );
            events.extend(self.lifecycle.drain_events());
            events.extend(telegraphs);
        }

        let actions = self.update_agents(elapsed_ms, player.position());
        for (enemy, action) in actions {
            self.resolve_agent_action(enemy, action, player, &mut events);
        }
        self.move_enemies(elapsed_ms);

        for task in self.scheduler.drain_due(self.now_ms) {
            self.run_task(task, &mut events);
        }
        events
    }

    /// Resolves a player strike against `enemy`.
    pub fn player_attack(
        &mut self,
        enemy: EnemyId,
        player: &mut impl PlayerHandle,
    ) -> Vec<FloorEvent> {
        let mut events = Vec::new();
        let Some(agent) = self.enemies.get(enemy) else {
            return events;
        };
        let attacker = CombatStats {
            attack: player.attack(),
            defense: player.defense(),
            position: player.position(),
        };
        let defender =
            CombatStats { attack: agent.attack, defense: agent.defense, position: agent.position };
        let result = resolve_attack(&attacker, &defender, &mut self.rng);
        self.damage_enemy(enemy, &result, player, &mut events);
        events
    }

    fn update_agents(
        &mut self,
        elapsed_ms: u32,
        player_position: Vec2,
    ) -> Vec<(EnemyId, AgentAction)> {
        let structures = &self.structures;
        let locate = |target: TargetRef| match target {
            TargetRef::Player => Some(player_position),
            TargetRef::Structure(id) => structures.get(id).map(|structure| structure.position),
        };

        let mut actions = Vec::new();
        for (id, agent) in &mut self.enemies {
            let intent = agent.update(elapsed_ms, &locate);
            actions.extend(intent.actions.into_iter().map(|action| (id, action)));
        }
        actions
    }

    fn resolve_agent_action(
        &mut self,
        enemy: EnemyId,
        action: AgentAction,
        player: &mut impl PlayerHandle,
        events: &mut Vec<FloorEvent>,
    ) {
        let Some(agent) = self.enemies.get(enemy) else {
            return;
        };
        let attacker =
            CombatStats { attack: agent.attack, defense: agent.defense, position: agent.position };

        match action {
            AgentAction::Attack { target } => {
                events.push(FloorEvent::EnemyAttack {
                    enemy,
                    attacker_position: attacker.position,
                    target,
                });
                match target {
                    TargetRef::Player => {
                        let defender = CombatStats {
                            attack: player.attack(),
                            defense: player.defense(),
                            position: player.position(),
                        };
                        let result = resolve_attack(&attacker, &defender, &mut self.rng);
                        player.receive_hit(&result);
                        events.push(FloorEvent::DamageApplied {
                            target: DamageTarget::Player,
                            position: defender.position,
                            amount: result.damage,
                            is_critical: result.is_critical,
                        });
                    }
                    TargetRef::Structure(id) => {
                        let Some(structure) = self.structures.get(id) else {
                            return;
                        };
                        let defender = CombatStats {
                            attack: 0,
                            defense: structure.defense,
                            position: structure.position,
                        };
                        let result = resolve_attack(&attacker, &defender, &mut self.rng);
                        self.damage_structure(id, result.damage, result.is_critical, events);
                    }
                }
            }
            AgentAction::AuraPulse { target, damage, radius } => {
                events.push(FloorEvent::AuraPulse {
                    enemy,
                    position: attacker.position,
                    radius,
                    damage,
                });
                match target {
                    TargetRef::Player => {
                        let hit =
                            CombatResult { damage, is_critical: false, knockback: Vec2::ZERO };
                        player.receive_hit(&hit);
                        events.push(FloorEvent::DamageApplied {
                            target: DamageTarget::Player,
                            position: player.position(),
                            amount: damage,
                            is_critical: false,
                        });
                    }
                    TargetRef::Structure(id) => self.damage_structure(id, damage, false, events),
                }
            }
        }
    }

    fn damage_structure(
        &mut self,
        id: StructureId,
        amount: i32,
        is_critical: bool,
        events: &mut Vec<FloorEvent>,
    ) {
        let Some(structure) = self.structures.get_mut(id) else {
            return;
        };
        structure.hp -= amount;
        events.push(FloorEvent::DamageApplied {
            target: DamageTarget::Structure(id),
            position: structure.position,
            amount,
            is_critical,
        });
        if structure.hp > 0 {
            return;
        }

        let position = structure.position;
        self.structures.remove(id);
        for agent in self.enemies.values_mut() {
            if agent.secondary_target == Some(TargetRef::Structure(id)) {
                agent.secondary_target = None;
            }
        }
        debug!(?position, "structure destroyed");
        events.push(FloorEvent::StructureDestroyed { structure: id, position });
    }

    fn damage_enemy(
        &mut self,
        enemy: EnemyId,
        hit: &CombatResult,
        player: &mut impl PlayerHandle,
        events: &mut Vec<FloorEvent>,
    ) {
        let Some(agent) = self.enemies.get_mut(enemy) else {
            return;
        };
        let outcome = agent.take_damage(hit.damage);
        events.push(FloorEvent::DamageApplied {
            target: DamageTarget::Enemy(enemy),
            position: agent.position,
            amount: outcome.applied,
            is_critical: hit.is_critical,
        });
        if outcome.reflected > 0 {
            player.receive_hit(&CombatResult {
                damage: outcome.reflected,
                is_critical: false,
                knockback: Vec2::ZERO,
            });
            events.push(FloorEvent::DamageReflected { enemy, amount: outcome.reflected });
        }
        if let Some(phase) = outcome.phase_changed {
            info!(phase, archetype = ?agent.archetype, "boss entered a new phase");
            events.push(FloorEvent::BossPhaseChanged { enemy, phase });
        }
        if outcome.died {
            self.kill_enemy(enemy, events);
            return;
        }

        agent.knockback = hit.knockback * (1.0 / PIXELS_PER_TILE);
        self.scheduler.cancel_enemy(enemy);
        self.scheduler.schedule(
            self.now_ms + u64::from(KNOCKBACK_WINDOW_MS),
            ScheduledTask::ClearKnockback { enemy },
        );
    }

    fn kill_enemy(&mut self, enemy: EnemyId, events: &mut Vec<FloorEvent>) {
        let Some(agent) = self.enemies.remove(enemy) else {
            return;
        };
        self.scheduler.cancel_enemy(enemy);
        debug!(archetype = ?agent.archetype, room = agent.room_id.0, "enemy died");
        events.push(FloorEvent::EnemyDeath {
            enemy,
            position: agent.position,
            xp_value: agent.xp_value,
            archetype: agent.archetype,
        });

        if self.lifecycle.active_room() != Some(agent.room_id) {
            return;
        }
        let remaining =
            self.enemies.values().filter(|other| other.room_id == agent.room_id).count();
        if let Some(room) = self.lifecycle.on_enemy_killed(remaining) {
            let cancelled = self.scheduler.cancel_room(room);
            if cancelled > 0 {
                debug!(room = room.0, cancelled, "cancelled pending spawns for cleared room");
            }
        }
        events.extend(self.lifecycle.drain_events());
    }

    fn move_enemies(&mut self, elapsed_ms: u32) {
        let seconds = elapsed_ms as f32 / 1_000.0;
        let grid = &self.floor.grid;
        let lifecycle = &self.lifecycle;
        let passable = |point: Vec2| {
            let cell = point.cell();
            grid.is_floor(cell) && !lifecycle.is_door_sealed(cell)
        };

        for agent in self.enemies.values_mut() {
            let displacement = (agent.velocity + agent.knockback) * seconds;
            agent.position = slide(agent.position, displacement, &passable);
        }
    }

    fn run_task(&mut self, task: ScheduledTask, events: &mut Vec<FloorEvent>) {
        match task {
            ScheduledTask::SpawnWave { room, plan } => self.spawn_wave(room, plan, events),
            ScheduledTask::ClearKnockback { enemy } => {
                if let Some(agent) = self.enemies.get_mut(enemy) {
                    agent.knockback = Vec2::ZERO;
                }
            }
        }
    }

    fn spawn_wave(&mut self, room: RoomId, plan: SpawnPlan, events: &mut Vec<FloorEvent>) {
        if self.lifecycle.active_room() != Some(room) {
            return;
        }
        for entry in plan.entries {
            let mut agent = EnemyAgent::new(entry.archetype, entry.profile, entry.position, room);
            agent.secondary_target =
                self.nearest_structure(entry.position).map(TargetRef::Structure);
            let id = self.enemies.insert(agent);
            events.push(FloorEvent::EnemySpawned {
                enemy: id,
                room,
                position: entry.position,
                archetype: entry.archetype,
            });
        }
        debug!(room = room.0, live = self.enemies.len(), "wave spawned");
    }

    fn nearest_structure(&self, from: Vec2) -> Option<StructureId> {
        self.structures
            .iter()
            .min_by(|(_, a), (_, b)| {
                from.distance(a.position).total_cmp(&from.distance(b.position))
            })
            .map(|(id, _)| id)
    }
}

/// Moves in small steps, sliding along whichever axis stays passable.
fn slide(start: Vec2, displacement: Vec2, passable: impl Fn(Vec2) -> bool) -> Vec2 {
    let distance = displacement.length();
    if distance <= f32::EPSILON {
        return start;
    }
    let steps = (distance / MAX_STEP_TILES).ceil().max(1.0) as u32;
    let step = displacement * (1.0 / steps as f32);

    let mut position = start;
    for _ in 0..steps {
        let next = position + step;
        if passable(next) {
            position = next;
        } else if passable(Vec2::new(next.x, position.y)) {
            position.x = next.x;
        } else if passable(Vec2::new(position.x, next.y)) {
            position.y = next.y;
        } else {
            break;
        }
    }
    position
}
