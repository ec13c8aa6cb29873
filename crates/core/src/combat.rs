//! Attack resolution: damage, critical hits, knockback.

use rand_chacha::rand_core::Rng;
use serde::{Deserialize, Serialize};

use crate::mapgen::seed::random_unit;
use crate::types::Vec2;

pub const CRIT_CHANCE: f64 = 0.10;
pub const CRIT_MULTIPLIER: i32 = 2;
/// Knockback force in pixels; hosts convert to their own units.
pub const KNOCKBACK_FORCE: f32 = 200.0;
pub const MIN_DAMAGE: i32 = 1;

const DEFAULT_KNOCKBACK_DIRECTION: Vec2 = Vec2 { x: 1.0, y: 0.0 };

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombatStats {
    pub attack: i32,
    pub defense: i32,
    pub position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    pub damage: i32,
    pub is_critical: bool,
    pub knockback: Vec2,
}

pub fn resolve_attack(
    attacker: &CombatStats,
    defender: &CombatStats,
    rng: &mut impl Rng,
) -> CombatResult {
    resolve_with_roll(attacker, defender, random_unit(rng))
}

/// `crit_roll` is a uniform draw in `[0, 1)`; below `CRIT_CHANCE` the hit is critical.
pub fn resolve_with_roll(
    attacker: &CombatStats,
    defender: &CombatStats,
    crit_roll: f64,
) -> CombatResult {
    let base = (attacker.attack - defender.defense).max(MIN_DAMAGE);
    let is_critical = crit_roll < CRIT_CHANCE;
    let damage = if is_critical { base * CRIT_MULTIPLIER } else { base };

    let direction = (defender.position - attacker.position)
        .normalized()
        .unwrap_or(DEFAULT_KNOCKBACK_DIRECTION);

    CombatResult { damage, is_critical, knockback: direction * KNOCKBACK_FORCE }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::mapgen::GenerationSeed;

    fn stats(attack: i32, defense: i32, x: f32, y: f32) -> CombatStats {
        CombatStats { attack, defense, position: Vec2::new(x, y) }
    }

    #[test]
    fn overwhelming_defense_still_deals_one_damage() {
        let result = resolve_with_roll(&stats(10, 0, 0.0, 0.0), &stats(0, 15, 1.0, 0.0), 0.5);
        assert_eq!(result.damage, 1);
        assert!(!result.is_critical);
    }

    #[test]
    fn critical_roll_doubles_damage() {
        let attacker = stats(12, 0, 0.0, 0.0);
        let defender = stats(0, 4, 0.0, 3.0);
        let normal = resolve_with_roll(&attacker, &defender, 0.9);
        let critical = resolve_with_roll(&attacker, &defender, 0.05);
        assert_eq!(normal.damage, 8);
        assert!(critical.is_critical);
        assert_eq!(critical.damage, normal.damage * 2);
        assert_eq!(critical.knockback, normal.knockback);
    }

    #[test]
    fn knockback_points_away_from_attacker() {
        let result = resolve_with_roll(&stats(5, 0, 2.0, 2.0), &stats(0, 0, 2.0, 5.0), 0.5);
        assert!(result.knockback.x.abs() < 1e-4);
        assert!((result.knockback.y - KNOCKBACK_FORCE).abs() < 1e-3);
    }

    #[test]
    fn coincident_positions_push_along_default_axis() {
        let result = resolve_with_roll(&stats(5, 0, 4.0, 4.0), &stats(0, 0, 4.0, 4.0), 0.5);
        assert_eq!(result.knockback, Vec2::new(KNOCKBACK_FORCE, 0.0));
    }

    #[test]
    fn seeded_rolls_produce_roughly_ten_percent_crits() {
        let mut rng = GenerationSeed(31).rng();
        let attacker = stats(8, 0, 0.0, 0.0);
        let defender = stats(0, 2, 1.0, 1.0);
        let crits = (0..10_000)
            .filter(|_| resolve_attack(&attacker, &defender, &mut rng).is_critical)
            .count();
        assert!((800..1_200).contains(&crits), "crit count {crits}");
    }

    proptest! {
        #[test]
        fn damage_is_positive_and_knockback_magnitude_is_fixed(
            attack in -50_i32..200,
            defense in -50_i32..200,
            ax in -100.0_f32..100.0,
            ay in -100.0_f32..100.0,
            dx in -100.0_f32..100.0,
            dy in -100.0_f32..100.0,
            roll in 0.0_f64..1.0,
        ) {
            let attacker = stats(attack, 0, ax, ay);
            let defender = stats(0, defense, dx, dy);
            let result = resolve_with_roll(&attacker, &defender, roll);
            prop_assert!(result.damage >= MIN_DAMAGE);
            prop_assert!((result.knockback.length() - KNOCKBACK_FORCE).abs() < 0.1);

            let plain = resolve_with_roll(&attacker, &defender, 0.99);
            let critical = resolve_with_roll(&attacker, &defender, 0.0);
            prop_assert_eq!(critical.damage, plain.damage * 2);
        }
    }
}
