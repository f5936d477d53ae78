//! StatBlock - Aggregated character stats from all sources

mod aggregator;
mod computed;
mod stat_value;

pub use aggregator::StatAccumulator;
pub use computed::{DerivedStat, DerivedStats};
pub use stat_value::StatValue;

use crate::source::StatSource;
use crate::types::StatKind;
use serde::{Deserialize, Serialize};

/// Complete stat state for a character, built once per configuration.
///
/// A StatBlock is never mutated during a trial: temporary changes come from
/// aura modifiers gathered at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    // === Primary ===
    pub strength: StatValue,
    pub agility: StatValue,
    pub intellect: StatValue,
    pub stamina: StatValue,

    // === Power ===
    pub spell_power: StatValue,
    pub attack_power: StatValue,

    // === Ratings ===
    pub crit_rating: StatValue,
    pub haste_rating: StatValue,
    pub hit_rating: StatValue,
    pub expertise_rating: StatValue,
    pub mastery_rating: StatValue,

    // === Defense / Pools ===
    pub armor: StatValue,
    pub health: StatValue,
    pub mana: StatValue,
}

impl StatBlock {
    /// Create an empty StatBlock
    pub fn new() -> Self {
        Self::default()
    }

    /// Build stats from all sources, lowest priority first
    pub fn from_sources(sources: &[&dyn StatSource]) -> Self {
        let mut accumulator = StatAccumulator::new();

        let mut sorted_sources: Vec<_> = sources.iter().collect();
        sorted_sources.sort_by_key(|s| s.priority());

        for source in sorted_sources {
            source.apply(&mut accumulator);
        }

        let mut block = StatBlock::new();
        accumulator.apply_to(&mut block);
        block
    }

    pub fn stat(&self, kind: StatKind) -> &StatValue {
        match kind {
            StatKind::Strength => &self.strength,
            StatKind::Agility => &self.agility,
            StatKind::Intellect => &self.intellect,
            StatKind::Stamina => &self.stamina,
            StatKind::SpellPower => &self.spell_power,
            StatKind::AttackPower => &self.attack_power,
            StatKind::CritRating => &self.crit_rating,
            StatKind::HasteRating => &self.haste_rating,
            StatKind::HitRating => &self.hit_rating,
            StatKind::ExpertiseRating => &self.expertise_rating,
            StatKind::MasteryRating => &self.mastery_rating,
            StatKind::Armor => &self.armor,
            StatKind::Health => &self.health,
            StatKind::Mana => &self.mana,
        }
    }

    pub fn stat_mut(&mut self, kind: StatKind) -> &mut StatValue {
        match kind {
            StatKind::Strength => &mut self.strength,
            StatKind::Agility => &mut self.agility,
            StatKind::Intellect => &mut self.intellect,
            StatKind::Stamina => &mut self.stamina,
            StatKind::SpellPower => &mut self.spell_power,
            StatKind::AttackPower => &mut self.attack_power,
            StatKind::CritRating => &mut self.crit_rating,
            StatKind::HasteRating => &mut self.haste_rating,
            StatKind::HitRating => &mut self.hit_rating,
            StatKind::ExpertiseRating => &mut self.expertise_rating,
            StatKind::MasteryRating => &mut self.mastery_rating,
            StatKind::Armor => &mut self.armor,
            StatKind::Health => &mut self.health,
            StatKind::Mana => &mut self.mana,
        }
    }

    /// Computed value of a single stat
    pub fn value(&self, kind: StatKind) -> f64 {
        self.stat(kind).compute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaseStats;
    use crate::source::BaseStatsSource;

    struct FlatIntellect(f64, i32);

    impl StatSource for FlatIntellect {
        fn id(&self) -> &str {
            "flat_intellect"
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn apply(&self, stats: &mut StatAccumulator) {
            stats.add_flat(StatKind::Intellect, self.0);
        }
    }

    #[test]
    fn test_from_sources() {
        let base = BaseStatsSource::new(BaseStats {
            intellect: 1000.0,
            ..BaseStats::default()
        });
        let gear = FlatIntellect(500.0, 0);
        let block = StatBlock::from_sources(&[&gear, &base]);
        assert!((block.value(StatKind::Intellect) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_stat_mut_round_trips_kind() {
        let mut block = StatBlock::new();
        block.stat_mut(StatKind::HasteRating).add_flat(425.0);
        assert!((block.haste_rating.compute() - 425.0).abs() < f64::EPSILON);
        assert!((block.value(StatKind::HasteRating) - 425.0).abs() < f64::EPSILON);
    }
}
