//! Per-enemy state machine.
//!
//! Every archetype shares one `EnemyAgent` type. Archetype-specific traits live in
//! optional fields and are consulted by the single `update` routine, so a ranged
//! skirmisher, an aura carrier and a boss all run through the same decision code.

use serde::{Deserialize, Serialize};

use crate::content::{ArchetypeProfile, AuraSpec};
use crate::types::{AiState, Archetype, RoomId, TargetRef, Vec2};

pub const RETREAT_THRESHOLD: f32 = 0.2;
pub const ATTACK_RANGE: f32 = 1.5;
pub const CHASE_RANGE: f32 = 8.0;
pub const ATTACK_INTERVAL_MS: u32 = 1_000;
pub const RETREAT_SPEED_FACTOR: f32 = 0.7;
/// Ranged archetypes start closing in this far beyond their attack range.
pub const RANGED_CHASE_MARGIN: f32 = 4.0;

const BOSS_INTERVAL_REDUCTION_PER_PHASE: f32 = 0.2;
const BOSS_SPEED_BONUS_PER_PHASE: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuraState {
    pub radius: f32,
    pub damage: i32,
    pub interval_ms: u32,
    pub remaining_ms: u32,
}

impl From<AuraSpec> for AuraState {
    fn from(spec: AuraSpec) -> Self {
        Self {
            radius: spec.radius,
            damage: spec.damage,
            interval_ms: spec.interval_ms,
            remaining_ms: spec.interval_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BossPhases {
    /// HP fractions, highest first.
    pub thresholds: [f32; 2],
    pub phase: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyAgent {
    pub archetype: Archetype,
    pub room_id: RoomId,
    pub position: Vec2,
    /// Movement intent in tiles per second, set by `update`.
    pub velocity: Vec2,
    /// Transient impulse from the last hit, in tiles per second.
    pub knockback: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: f32,
    pub base_speed: f32,
    pub xp_value: u32,
    pub ai_state: AiState,
    pub attack_cooldown_ms: u32,
    pub attack_interval_ms: u32,
    pub primary_target: Option<TargetRef>,
    pub secondary_target: Option<TargetRef>,
    pub attack_range: Option<f32>,
    pub aura: Option<AuraState>,
    pub reflect_percent: Option<u8>,
    pub boss: Option<BossPhases>,
}

/// What an agent wants the host to do after one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentIntent {
    pub velocity: Vec2,
    pub target: Option<TargetRef>,
    pub actions: Vec<AgentAction>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentAction {
    Attack { target: TargetRef },
    AuraPulse { target: TargetRef, damage: i32, radius: f32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    pub applied: i32,
    pub reflected: i32,
    pub died: bool,
    pub phase_changed: Option<u8>,
}

impl EnemyAgent {
    pub fn new(
        archetype: Archetype,
        profile: ArchetypeProfile,
        position: Vec2,
        room_id: RoomId,
    ) -> Self {
        let max_hp = profile.hp.max(1);
        Self {
            archetype,
            room_id,
            position,
            velocity: Vec2::ZERO,
            knockback: Vec2::ZERO,
            hp: max_hp,
            max_hp,
            attack: profile.attack,
            defense: profile.defense,
            speed: profile.speed,
            base_speed: profile.speed,
            xp_value: profile.xp_value,
            ai_state: AiState::Idle,
            attack_cooldown_ms: 0,
            attack_interval_ms: ATTACK_INTERVAL_MS,
            primary_target: Some(TargetRef::Player),
            secondary_target: None,
            attack_range: profile.attack_range,
            aura: profile.aura.map(AuraState::from),
            reflect_percent: profile.reflect_percent,
            boss: profile.phase_thresholds.map(|thresholds| BossPhases { thresholds, phase: 0 }),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_fraction(&self) -> f32 {
        self.hp as f32 / self.max_hp as f32
    }

    pub fn effective_attack_range(&self) -> f32 {
        self.attack_range.unwrap_or(ATTACK_RANGE)
    }

    pub fn effective_chase_range(&self) -> f32 {
        match self.attack_range {
            Some(range) => range + RANGED_CHASE_MARGIN,
            None => CHASE_RANGE,
        }
    }

    /// State for a target `distance` tiles away, or `Idle` with nothing to act on.
    pub fn decide_state(&self, distance: Option<f32>) -> AiState {
        let Some(distance) = distance else {
            return AiState::Idle;
        };
        if self.hp_fraction() <= RETREAT_THRESHOLD {
            AiState::Retreat
        } else if distance <= self.effective_attack_range() {
            AiState::Attack
        } else if distance <= self.effective_chase_range() {
            AiState::Chase
        } else {
            AiState::Idle
        }
    }

    /// Picks whichever of the primary and secondary target is closer right now.
    pub fn select_target(
        &self,
        locate: impl Fn(TargetRef) -> Option<Vec2>,
    ) -> Option<(TargetRef, Vec2)> {
        [self.primary_target, self.secondary_target]
            .into_iter()
            .flatten()
            .filter_map(|target| locate(target).map(|position| (target, position)))
            .min_by(|(_, a), (_, b)| {
                self.position.distance(*a).total_cmp(&self.position.distance(*b))
            })
    }

    /// Advances timers by `elapsed_ms`, re-evaluates the state and reports intent.
    ///
    /// `locate` maps a target reference to its current position; `None` means the
    /// target no longer exists.
    pub fn update(
        &mut self,
        elapsed_ms: u32,
        locate: impl Fn(TargetRef) -> Option<Vec2>,
    ) -> AgentIntent {
        self.attack_cooldown_ms = self.attack_cooldown_ms.saturating_sub(elapsed_ms);
        if let Some(aura) = self.aura.as_mut() {
            aura.remaining_ms = aura.remaining_ms.saturating_sub(elapsed_ms);
        }

        let selected = self.select_target(locate);
        let distance = selected.map(|(_, position)| self.position.distance(position));
        self.ai_state = self.decide_state(distance);

        let mut intent =
            AgentIntent { target: selected.map(|(target, _)| target), ..AgentIntent::default() };
        let Some((target, target_position)) = selected else {
            self.velocity = Vec2::ZERO;
            return intent;
        };
        let toward = (target_position - self.position).normalized().unwrap_or(Vec2::ZERO);

        self.velocity = match self.ai_state {
            AiState::Idle => Vec2::ZERO,
            AiState::Chase => toward * self.speed,
            AiState::Attack => {
                if self.attack_cooldown_ms == 0 {
                    intent.actions.push(AgentAction::Attack { target });
                    self.attack_cooldown_ms = self.attack_interval_ms;
                }
                Vec2::ZERO
            }
            AiState::Retreat => -toward * (self.speed * RETREAT_SPEED_FACTOR),
        };

        if let Some(aura) = self.aura.as_mut()
            && aura.remaining_ms == 0
            && distance.is_some_and(|distance| distance <= aura.radius)
        {
            intent.actions.push(AgentAction::AuraPulse {
                target,
                damage: aura.damage,
                radius: aura.radius,
            });
            aura.remaining_ms = aura.interval_ms;
        }

        intent.velocity = self.velocity;
        intent
    }

    /// Applies a hit. Dead agents ignore further damage.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::default();
        }
        let applied = amount.max(0);
        self.hp -= applied;

        let reflected = self
            .reflect_percent
            .map_or(0, |percent| applied * i32::from(percent) / 100);
        let died = !self.is_alive();
        let phase_changed = if died { None } else { self.advance_boss_phase() };

        DamageOutcome { applied, reflected, died, phase_changed }
    }

    fn advance_boss_phase(&mut self) -> Option<u8> {
        let fraction = self.hp_fraction();
        let boss = self.boss.as_mut()?;
        let reached =
            boss.thresholds.iter().filter(|threshold| fraction <= **threshold).count() as u8;
        if reached <= boss.phase {
            return None;
        }
        boss.phase = reached;

        let phase = f32::from(reached);
        let interval_scale = (1.0 - BOSS_INTERVAL_REDUCTION_PER_PHASE * phase).max(0.1);
        self.attack_interval_ms = (ATTACK_INTERVAL_MS as f32 * interval_scale).round() as u32;
        self.speed = self.base_speed * (1.0 + BOSS_SPEED_BONUS_PER_PHASE * phase);
        Some(reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::archetype_profile;
    use crate::types::StructureId;

    fn grunt_at(x: f32, y: f32) -> EnemyAgent {
        EnemyAgent::new(
            Archetype::Grunt,
            archetype_profile(Archetype::Grunt),
            Vec2::new(x, y),
            RoomId(1),
        )
    }

    fn player_at(position: Vec2) -> impl Fn(TargetRef) -> Option<Vec2> {
        move |target| (target == TargetRef::Player).then_some(position)
    }

    #[test]
    fn low_hp_agent_retreats_even_inside_attack_range() {
        let mut agent = grunt_at(0.0, 0.0);
        agent.max_hp = 30;
        agent.hp = 5;
        assert_eq!(agent.decide_state(Some(0.5)), AiState::Retreat);

        let intent = agent.update(16, player_at(Vec2::new(0.5, 0.0)));
        assert!(intent.actions.is_empty());
        assert!(intent.velocity.x < 0.0);
        let expected = agent.speed * RETREAT_SPEED_FACTOR;
        assert!((intent.velocity.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn range_bands_select_attack_chase_and_idle() {
        let agent = grunt_at(0.0, 0.0);
        assert_eq!(agent.decide_state(Some(1.5)), AiState::Attack);
        assert_eq!(agent.decide_state(Some(1.6)), AiState::Chase);
        assert_eq!(agent.decide_state(Some(8.0)), AiState::Chase);
        assert_eq!(agent.decide_state(Some(8.1)), AiState::Idle);
        assert_eq!(agent.decide_state(None), AiState::Idle);
    }

    #[test]
    fn ranged_archetype_uses_its_own_bands() {
        let archer = EnemyAgent::new(
            Archetype::Archer,
            archetype_profile(Archetype::Archer),
            Vec2::ZERO,
            RoomId(2),
        );
        assert_eq!(archer.decide_state(Some(5.5)), AiState::Attack);
        assert_eq!(archer.decide_state(Some(9.5)), AiState::Chase);
        assert_eq!(archer.decide_state(Some(10.5)), AiState::Idle);
    }

    #[test]
    fn chase_moves_toward_target_at_full_speed() {
        let mut agent = grunt_at(0.0, 0.0);
        let intent = agent.update(16, player_at(Vec2::new(0.0, 5.0)));
        assert_eq!(agent.ai_state, AiState::Chase);
        assert!((intent.velocity.y - agent.speed).abs() < 1e-4);
        assert!(intent.velocity.x.abs() < 1e-4);
    }

    #[test]
    fn attack_fires_once_per_interval_and_cooldown_runs_in_every_state() {
        let mut agent = grunt_at(0.0, 0.0);
        let near = player_at(Vec2::new(1.0, 0.0));

        let first = agent.update(16, &near);
        assert_eq!(first.actions, vec![AgentAction::Attack { target: TargetRef::Player }]);
        assert_eq!(first.velocity, Vec2::ZERO);
        assert!(agent.update(500, &near).actions.is_empty());

        agent.update(500, player_at(Vec2::new(30.0, 0.0)));
        assert_eq!(agent.ai_state, AiState::Idle);
        assert_eq!(agent.attack_cooldown_ms, 0);

        let again = agent.update(16, &near);
        assert_eq!(again.actions.len(), 1);
    }

    #[test]
    fn missing_target_is_an_idle_tick() {
        let mut agent = grunt_at(3.0, 3.0);
        agent.primary_target = None;
        let intent = agent.update(16, player_at(Vec2::ZERO));
        assert_eq!(agent.ai_state, AiState::Idle);
        assert_eq!(intent, AgentIntent::default());

        let mut agent = grunt_at(3.0, 3.0);
        let intent = agent.update(16, |_| None);
        assert_eq!(intent.target, None);
        assert_eq!(agent.ai_state, AiState::Idle);
    }

    #[test]
    fn closer_secondary_target_wins_each_tick() {
        let mut structures = slotmap::SlotMap::<StructureId, ()>::with_key();
        let wall = structures.insert(());
        let mut agent = grunt_at(0.0, 0.0);
        agent.secondary_target = Some(TargetRef::Structure(wall));

        let locate_near_structure = |target| match target {
            TargetRef::Player => Some(Vec2::new(6.0, 0.0)),
            TargetRef::Structure(_) => Some(Vec2::new(0.0, 2.0)),
        };
        let intent = agent.update(16, locate_near_structure);
        assert_eq!(intent.target, Some(TargetRef::Structure(wall)));

        let locate_near_player = |target| match target {
            TargetRef::Player => Some(Vec2::new(1.0, 0.0)),
            TargetRef::Structure(_) => Some(Vec2::new(0.0, 2.0)),
        };
        let intent = agent.update(16, locate_near_player);
        assert_eq!(intent.target, Some(TargetRef::Player));
    }

    #[test]
    fn aura_pulses_on_its_own_interval_while_target_is_close() {
        let mut fiend = EnemyAgent::new(
            Archetype::WrathFiend,
            archetype_profile(Archetype::WrathFiend),
            Vec2::ZERO,
            RoomId(3),
        );
        let close = player_at(Vec2::new(2.0, 0.0));
        let pulses = |intent: &AgentIntent| {
            intent
                .actions
                .iter()
                .filter(|action| matches!(action, AgentAction::AuraPulse { .. }))
                .count()
        };

        assert_eq!(pulses(&fiend.update(1_000, &close)), 0);
        assert_eq!(pulses(&fiend.update(1_000, &close)), 1);
        assert_eq!(pulses(&fiend.update(1_000, &close)), 0);
        assert_eq!(pulses(&fiend.update(1_000, &close)), 1);
    }

    #[test]
    fn reflect_archetype_returns_a_share_of_damage() {
        let mut husk = EnemyAgent::new(
            Archetype::PrideHusk,
            archetype_profile(Archetype::PrideHusk),
            Vec2::ZERO,
            RoomId(4),
        );
        let outcome = husk.take_damage(8);
        assert_eq!(outcome.applied, 8);
        assert_eq!(outcome.reflected, 2);
        assert!(!outcome.died);
        assert_eq!(grunt_at(0.0, 0.0).take_damage(8).reflected, 0);
    }

    #[test]
    fn boss_accelerates_when_crossing_each_phase_threshold() {
        let mut boss = EnemyAgent::new(
            Archetype::Warden,
            archetype_profile(Archetype::Warden),
            Vec2::ZERO,
            RoomId(5),
        );
        boss.max_hp = 100;
        boss.hp = 100;
        let base_speed = boss.speed;

        assert_eq!(boss.take_damage(20).phase_changed, None);
        assert_eq!(boss.take_damage(20).phase_changed, Some(1));
        assert_eq!(boss.attack_interval_ms, 800);
        assert!(boss.speed > base_speed);
        assert_eq!(boss.take_damage(5).phase_changed, None);
        assert_eq!(boss.take_damage(30).phase_changed, Some(2));
        assert_eq!(boss.attack_interval_ms, 600);
    }

    #[test]
    fn death_is_reported_once() {
        let mut agent = grunt_at(0.0, 0.0);
        let lethal = agent.take_damage(agent.max_hp + 5);
        assert!(lethal.died);
        assert!(!agent.is_alive());
        assert_eq!(agent.take_damage(3), DamageOutcome::default());
    }
}
