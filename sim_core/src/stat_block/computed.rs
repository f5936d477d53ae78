//! Derived stat calculations: rating conversions and pool sizes

use super::StatBlock;
use crate::config::GameConstants;
use crate::types::StatKind;
use serde::{Deserialize, Serialize};

/// Numbers the combat engine reads, computed once from a StatBlock.
/// Percentages are in percent units (5.0 = 5%).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub spell_power: f64,
    pub attack_power: f64,
    pub crit_percent: f64,
    pub haste_percent: f64,
    pub hit_percent: f64,
    pub expertise_percent: f64,
    pub mastery: f64,
    pub armor: f64,
    pub max_health: f64,
    pub max_mana: f64,
}

/// A derived number that rotation conditions can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStat {
    SpellPower,
    AttackPower,
    CritPercent,
    HastePercent,
    HitPercent,
    ExpertisePercent,
    Mastery,
}

impl DerivedStats {
    /// Cast time and GCD divisor
    pub fn haste_multiplier(&self) -> f64 {
        1.0 + self.haste_percent / 100.0
    }

    pub fn get(&self, stat: DerivedStat) -> f64 {
        match stat {
            DerivedStat::SpellPower => self.spell_power,
            DerivedStat::AttackPower => self.attack_power,
            DerivedStat::CritPercent => self.crit_percent,
            DerivedStat::HastePercent => self.haste_percent,
            DerivedStat::HitPercent => self.hit_percent,
            DerivedStat::ExpertisePercent => self.expertise_percent,
            DerivedStat::Mastery => self.mastery,
        }
    }
}

impl StatBlock {
    pub fn derive(&self, constants: &GameConstants) -> DerivedStats {
        let ratings = &constants.ratings;
        let combat = &constants.combat;

        let strength = self.value(StatKind::Strength);
        let agility = self.value(StatKind::Agility);
        let intellect = self.value(StatKind::Intellect);
        let stamina = self.value(StatKind::Stamina);

        DerivedStats {
            spell_power: self.value(StatKind::SpellPower) + intellect * combat.spell_power_per_intellect,
            attack_power: self.value(StatKind::AttackPower) + strength * combat.attack_power_per_strength,
            crit_percent: rating_to_percent(self.value(StatKind::CritRating), ratings.crit_per_percent)
                + (agility + intellect) * ratings.crit_per_primary,
            haste_percent: rating_to_percent(self.value(StatKind::HasteRating), ratings.haste_per_percent),
            hit_percent: rating_to_percent(self.value(StatKind::HitRating), ratings.hit_per_percent),
            expertise_percent: rating_to_percent(
                self.value(StatKind::ExpertiseRating),
                ratings.expertise_per_percent,
            ),
            mastery: rating_to_percent(self.value(StatKind::MasteryRating), ratings.mastery_per_point),
            armor: self.value(StatKind::Armor),
            max_health: self.value(StatKind::Health) + stamina * combat.health_per_stamina,
            max_mana: self.value(StatKind::Mana),
        }
    }
}

fn rating_to_percent(rating: f64, per_percent: f64) -> f64 {
    if per_percent <= 0.0 {
        return 0.0;
    }
    rating / per_percent
}
