//! Single-roll outcome tables and magnitude calculation

use super::OutcomeTableKind;
use crate::aura::ModifierSnapshot;
use crate::defense::{apply_armor, DefenseProfile};
use crate::random::RandomStream;
use crate::stat_block::DerivedStats;
use crate::types::{OutcomeKind, SpellSchool};

/// Outcome chances as fractions, checked in order
/// miss → dodge → parry → block → crit, remainder hit
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeTable {
    pub miss: f64,
    pub dodge: f64,
    pub parry: f64,
    pub block: f64,
    pub crit: f64,
}

impl OutcomeTable {
    /// Build the table an attacker faces against a defender
    pub fn build(
        kind: OutcomeTableKind,
        attacker: &DerivedStats,
        crit_percent: f64,
        defender: &DefenseProfile,
    ) -> Self {
        let pct = |value: f64| (value / 100.0).max(0.0);
        match kind {
            OutcomeTableKind::Spell => OutcomeTable {
                miss: pct(defender.spell_miss - attacker.hit_percent),
                crit: pct(crit_percent),
                ..Default::default()
            },
            OutcomeTableKind::Melee => OutcomeTable {
                miss: pct(defender.melee_miss - attacker.hit_percent),
                dodge: pct(defender.dodge - attacker.expertise_percent),
                parry: pct(defender.parry - attacker.expertise_percent),
                block: pct(defender.block),
                crit: pct(crit_percent),
            },
            OutcomeTableKind::AlwaysHit => OutcomeTable {
                crit: pct(crit_percent),
                ..Default::default()
            },
        }
    }

    pub fn without_crit(mut self) -> Self {
        self.crit = 0.0;
        self
    }

    /// Classify one uniform draw. The first bucket containing it wins.
    pub fn classify(&self, roll: f64) -> OutcomeKind {
        let buckets = [
            (self.miss, OutcomeKind::Miss),
            (self.dodge, OutcomeKind::Dodge),
            (self.parry, OutcomeKind::Parry),
            (self.block, OutcomeKind::Block),
            (self.crit, OutcomeKind::Crit),
        ];
        let mut edge = 0.0;
        for (chance, outcome) in buckets {
            edge += chance;
            if roll < edge {
                return outcome;
            }
        }
        OutcomeKind::Hit
    }

    /// Draw exactly one value from the stream and classify it
    pub fn roll(&self, rng: &mut RandomStream) -> OutcomeKind {
        self.classify(rng.roll())
    }
}

/// Everything the final-amount calculation multiplies in
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeInputs {
    pub static_damage_percent: f64,
    /// Percent damage per point of the caster's mastery
    pub mastery_scaling: f64,
    pub crit_multiplier: f64,
    pub block_reduction: f64,
    /// Damage-taken modifiers on the receiving unit
    pub taken_multiplier: f64,
    pub armor: f64,
    pub armor_constant: f64,
    pub school: SpellSchool,
    pub heal: bool,
}

/// Final amount of a landed resolution:
/// `raw × (1 + additive%) × multiplier × mastery × crit × block × taken × armor`
pub fn final_amount(raw: f64, outcome: OutcomeKind, snapshot: &ModifierSnapshot, inputs: &MagnitudeInputs) -> f64 {
    if !outcome.landed() || raw <= 0.0 {
        return 0.0;
    }
    let additive = 1.0 + (snapshot.damage_done_percent + inputs.static_damage_percent) / 100.0;
    let mastery = 1.0 + snapshot.mastery * inputs.mastery_scaling / 100.0;
    let mut amount = raw * additive.max(0.0) * snapshot.damage_multiplier * mastery.max(0.0);

    match outcome {
        OutcomeKind::Crit => amount *= inputs.crit_multiplier,
        OutcomeKind::Block => amount *= 1.0 - inputs.block_reduction,
        _ => {}
    }

    if inputs.heal {
        return amount;
    }

    amount *= inputs.taken_multiplier;
    if inputs.school.is_physical() {
        amount = apply_armor(amount, inputs.armor, inputs.armor_constant);
    }
    amount.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> MagnitudeInputs {
        MagnitudeInputs {
            static_damage_percent: 0.0,
            mastery_scaling: 0.0,
            crit_multiplier: 2.0,
            block_reduction: 0.3,
            taken_multiplier: 1.0,
            armor: 0.0,
            armor_constant: 46257.5,
            school: SpellSchool::Fire,
            heal: false,
        }
    }

    #[test]
    fn test_classify_order() {
        let table = OutcomeTable {
            miss: 0.1,
            dodge: 0.1,
            parry: 0.1,
            block: 0.1,
            crit: 0.2,
        };
        assert_eq!(table.classify(0.05), OutcomeKind::Miss);
        assert_eq!(table.classify(0.15), OutcomeKind::Dodge);
        assert_eq!(table.classify(0.25), OutcomeKind::Parry);
        assert_eq!(table.classify(0.35), OutcomeKind::Block);
        assert_eq!(table.classify(0.45), OutcomeKind::Crit);
        assert_eq!(table.classify(0.65), OutcomeKind::Hit);
    }

    #[test]
    fn test_empty_table_always_hits() {
        let table = OutcomeTable::default();
        assert_eq!(table.classify(0.0), OutcomeKind::Hit);
        assert_eq!(table.classify(0.999), OutcomeKind::Hit);
    }

    #[test]
    fn test_roll_draws_once() {
        let mut rng = RandomStream::from_seed(3);
        OutcomeTable::default().roll(&mut rng);
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn test_hit_and_expertise_reduce_avoidance() {
        let attacker = DerivedStats {
            hit_percent: 4.0,
            expertise_percent: 3.0,
            ..Default::default()
        };
        let defender = DefenseProfile {
            melee_miss: 7.5,
            dodge: 7.5,
            parry: 2.0,
            ..Default::default()
        };
        let table = OutcomeTable::build(OutcomeTableKind::Melee, &attacker, 10.0, &defender);
        assert!((table.miss - 0.035).abs() < 1e-12);
        assert!((table.dodge - 0.045).abs() < 1e-12);
        assert_eq!(table.parry, 0.0);
        assert!((table.crit - 0.10).abs() < 1e-12);

        let spell = OutcomeTable::build(OutcomeTableKind::Spell, &attacker, 10.0, &defender);
        assert_eq!(spell.dodge, 0.0);
    }

    #[test]
    fn test_final_amount() {
        let snapshot = ModifierSnapshot {
            damage_done_percent: 10.0,
            damage_multiplier: 1.2,
            ..Default::default()
        };
        let hit = final_amount(1000.0, OutcomeKind::Hit, &snapshot, &inputs());
        assert!((hit - 1320.0).abs() < 1e-9);

        let crit = final_amount(1000.0, OutcomeKind::Crit, &snapshot, &inputs());
        assert!((crit - 2640.0).abs() < 1e-9);

        let miss = final_amount(1000.0, OutcomeKind::Miss, &snapshot, &inputs());
        assert_eq!(miss, 0.0);
    }

    #[test]
    fn test_mastery_scales_damage() {
        let snapshot = ModifierSnapshot {
            mastery: 20.0,
            ..Default::default()
        };
        // No scaling configured: mastery does nothing
        let plain = final_amount(1000.0, OutcomeKind::Hit, &snapshot, &inputs());
        assert!((plain - 1000.0).abs() < 1e-9);

        let mut scaled = inputs();
        scaled.mastery_scaling = 1.5;
        let hit = final_amount(1000.0, OutcomeKind::Hit, &snapshot, &scaled);
        assert!((hit - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn test_block_and_armor() {
        let snapshot = ModifierSnapshot::default();
        let mut physical = inputs();
        physical.school = SpellSchool::Physical;
        physical.armor = 46257.5;
        let blocked = final_amount(1000.0, OutcomeKind::Block, &snapshot, &physical);
        // 1000 × 0.7 × 0.5
        assert!((blocked - 350.0).abs() < 1e-9);
    }
}
