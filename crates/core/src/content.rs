//! Enemy archetype table: base stats and behavior traits.

use crate::types::{Archetype, Theme};

/// How an archetype's state machine differs from plain melee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Melee,
    Ranged,
    Aura,
    Reflect,
    Boss,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuraSpec {
    pub radius: f32,
    pub damage: i32,
    pub interval_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArchetypeProfile {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    /// Tiles per second.
    pub speed: f32,
    pub xp_value: u32,
    pub behavior: Behavior,
    pub attack_range: Option<f32>,
    pub aura: Option<AuraSpec>,
    pub reflect_percent: Option<u8>,
    pub phase_thresholds: Option<[f32; 2]>,
}

impl ArchetypeProfile {
    const fn melee(hp: i32, attack: i32, defense: i32, speed: f32, xp_value: u32) -> Self {
        Self {
            hp,
            attack,
            defense,
            speed,
            xp_value,
            behavior: Behavior::Melee,
            attack_range: None,
            aura: None,
            reflect_percent: None,
            phase_thresholds: None,
        }
    }

    const fn ranged(self, range: f32) -> Self {
        Self { behavior: Behavior::Ranged, attack_range: Some(range), ..self }
    }

    const fn aura(self, radius: f32, damage: i32) -> Self {
        Self {
            behavior: Behavior::Aura,
            aura: Some(AuraSpec { radius, damage, interval_ms: AURA_INTERVAL_MS }),
            ..self
        }
    }

    const fn reflect(self, percent: u8) -> Self {
        Self { behavior: Behavior::Reflect, reflect_percent: Some(percent), ..self }
    }

    const fn boss(self) -> Self {
        Self { behavior: Behavior::Boss, phase_thresholds: Some(BOSS_PHASE_THRESHOLDS), ..self }
    }
}

pub const AURA_INTERVAL_MS: u32 = 2_000;
/// HP fractions at which a boss enters its second and third phase.
pub const BOSS_PHASE_THRESHOLDS: [f32; 2] = [0.66, 0.33];

pub fn archetype_profile(archetype: Archetype) -> ArchetypeProfile {
    match archetype {
        Archetype::Grunt => ArchetypeProfile::melee(20, 5, 1, 2.0, 10),
        Archetype::Skitter => ArchetypeProfile::melee(12, 4, 0, 3.5, 8),
        Archetype::Brute => ArchetypeProfile::melee(45, 8, 4, 1.4, 25),
        Archetype::Archer => ArchetypeProfile::melee(16, 6, 0, 2.0, 15).ranged(6.0),
        Archetype::PrideHusk => ArchetypeProfile::melee(30, 6, 3, 1.8, 22).reflect(25),
        Archetype::WrathFiend => ArchetypeProfile::melee(24, 7, 1, 2.6, 20).aura(2.5, 3),
        Archetype::GreedGhoul => ArchetypeProfile::melee(18, 6, 1, 2.2, 30).ranged(5.0),
        Archetype::SlothShade => ArchetypeProfile::melee(34, 5, 2, 1.2, 20).aura(3.0, 2),
        Archetype::Warden => ArchetypeProfile::melee(160, 12, 5, 1.8, 200).boss(),
        Archetype::PrideTyrant => ArchetypeProfile::melee(180, 12, 6, 1.6, 240).boss(),
        Archetype::WrathWarlord => ArchetypeProfile::melee(150, 15, 4, 2.2, 240).boss(),
        Archetype::GreedKing => ArchetypeProfile::melee(140, 11, 5, 1.8, 300).boss(),
        Archetype::SlothColossus => ArchetypeProfile::melee(220, 13, 7, 1.2, 240).boss(),
    }
}

/// Dominant archetype for a themed floor.
pub fn themed_primary(theme: Theme) -> Archetype {
    match theme {
        Theme::Pride => Archetype::PrideHusk,
        Theme::Wrath => Archetype::WrathFiend,
        Theme::Greed => Archetype::GreedGhoul,
        Theme::Sloth => Archetype::SlothShade,
    }
}

pub fn boss_for_theme(theme: Option<Theme>) -> Archetype {
    match theme {
        None => Archetype::Warden,
        Some(Theme::Pride) => Archetype::PrideTyrant,
        Some(Theme::Wrath) => Archetype::WrathWarlord,
        Some(Theme::Greed) => Archetype::GreedKing,
        Some(Theme::Sloth) => Archetype::SlothColossus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Archetype; 13] = [
        Archetype::Grunt,
        Archetype::Skitter,
        Archetype::Brute,
        Archetype::Archer,
        Archetype::PrideHusk,
        Archetype::WrathFiend,
        Archetype::GreedGhoul,
        Archetype::SlothShade,
        Archetype::Warden,
        Archetype::PrideTyrant,
        Archetype::WrathWarlord,
        Archetype::GreedKing,
        Archetype::SlothColossus,
    ];

    #[test]
    fn behavior_fields_match_behavior_tag() {
        for archetype in ALL {
            let profile = archetype_profile(archetype);
            assert!(profile.hp > 0 && profile.speed > 0.0, "{archetype:?}");
            assert_eq!(profile.attack_range.is_some(), profile.behavior == Behavior::Ranged);
            assert_eq!(profile.aura.is_some(), profile.behavior == Behavior::Aura);
            assert_eq!(profile.reflect_percent.is_some(), profile.behavior == Behavior::Reflect);
            assert_eq!(profile.phase_thresholds.is_some(), profile.behavior == Behavior::Boss);
        }
    }

    #[test]
    fn every_theme_has_its_own_primary_and_boss() {
        let themes = [Theme::Pride, Theme::Wrath, Theme::Greed, Theme::Sloth];
        for theme in themes {
            assert_ne!(archetype_profile(themed_primary(theme)).behavior, Behavior::Boss);
            assert_eq!(archetype_profile(boss_for_theme(Some(theme))).behavior, Behavior::Boss);
        }
        assert_eq!(boss_for_theme(None), Archetype::Warden);
    }
}
