//! BaseStatsSource - The character's naked stats

use crate::config::BaseStats;
use crate::source::StatSource;
use crate::stat_block::StatAccumulator;
use crate::types::StatKind;

/// Stats the character has before any gear or talents
pub struct BaseStatsSource {
    pub base: BaseStats,
}

impl BaseStatsSource {
    pub fn new(base: BaseStats) -> Self {
        BaseStatsSource { base }
    }
}

impl StatSource for BaseStatsSource {
    fn id(&self) -> &str {
        "base_stats"
    }

    fn priority(&self) -> i32 {
        -100 // Base stats apply first
    }

    fn apply(&self, stats: &mut StatAccumulator) {
        stats.add_flat(StatKind::Strength, self.base.strength);
        stats.add_flat(StatKind::Agility, self.base.agility);
        stats.add_flat(StatKind::Intellect, self.base.intellect);
        stats.add_flat(StatKind::Stamina, self.base.stamina);
        stats.add_flat(StatKind::Health, self.base.health);
        stats.add_flat(StatKind::Mana, self.base.mana);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_stats_apply() {
        let source = BaseStatsSource::new(BaseStats {
            intellect: 1500.0,
            stamina: 900.0,
            ..BaseStats::default()
        });
        let mut acc = StatAccumulator::new();
        source.apply(&mut acc);

        assert!((acc.get(StatKind::Intellect).unwrap().flat - 1500.0).abs() < 0.01);
        assert!((acc.get(StatKind::Stamina).unwrap().flat - 900.0).abs() < 0.01);
        assert!((acc.get(StatKind::Health).unwrap().flat - 100_000.0).abs() < 0.01);
    }

    #[test]
    fn test_base_stats_priority() {
        let source = BaseStatsSource::new(BaseStats::default());
        assert_eq!(source.priority(), -100);
    }
}
