//! Aggregating aura modifiers into the numbers a resolution reads

use super::{Aura, AuraModifier, AuraSet};
use crate::spell::ScalingStat;
use crate::stat_block::DerivedStats;
use crate::types::{SpellSchool, StatModifier};
use serde::{Deserialize, Serialize};

/// When a spell or periodic effect reads its caster's modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierPolicy {
    /// Captured once: at cast completion for spells, at application for
    /// periodic effects
    #[default]
    Snapshot,
    /// Read again at the moment damage lands or a tick fires
    Live,
}

/// Sum of every active aura modifier relevant to one school
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifierTotals {
    pub damage_done_percent: f64,
    pub damage_multiplier: f64,
    pub crit_percent: f64,
    pub haste_multiplier: f64,
    pub damage_taken_multiplier: f64,
}

impl Default for ModifierTotals {
    fn default() -> Self {
        ModifierTotals {
            damage_done_percent: 0.0,
            damage_multiplier: 1.0,
            crit_percent: 0.0,
            haste_multiplier: 1.0,
            damage_taken_multiplier: 1.0,
        }
    }
}

fn school_matches(filter: Option<SpellSchool>, school: Option<SpellSchool>) -> bool {
    match (filter, school) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted == actual,
        (Some(_), None) => false,
    }
}

impl ModifierTotals {
    /// Fold the modifiers of every aura in `set`. `school` of `None` only
    /// picks up unscoped modifiers.
    pub fn collect(set: &AuraSet, auras: &[Aura], school: Option<SpellSchool>) -> Self {
        let mut totals = ModifierTotals::default();
        for active in set.iter() {
            let Some(template) = auras.get(active.aura.0) else {
                continue;
            };
            let stacks = active.stacks as f64;
            for modifier in &template.modifiers {
                match *modifier {
                    AuraModifier::DamageDone { percent, school: filter } => {
                        if school_matches(filter, school) {
                            totals.damage_done_percent += percent * stacks;
                        }
                    }
                    AuraModifier::DamageMultiplier { percent, school: filter } => {
                        if school_matches(filter, school) {
                            totals.damage_multiplier *= 1.0 + percent * stacks / 100.0;
                        }
                    }
                    AuraModifier::CritChance { percent } => {
                        totals.crit_percent += percent * stacks;
                    }
                    AuraModifier::Haste { percent } => {
                        totals.haste_multiplier *= 1.0 + percent * stacks / 100.0;
                    }
                    AuraModifier::DamageTaken { percent, school: filter } => {
                        if school_matches(filter, school) {
                            totals.damage_taken_multiplier *= 1.0 + percent * stacks / 100.0;
                        }
                    }
                    AuraModifier::Stat { .. } => {}
                }
            }
        }
        totals
    }

    /// Stat contributions of the active auras, scaled by stacks
    pub fn stat_modifiers(set: &AuraSet, auras: &[Aura]) -> Vec<StatModifier> {
        let mut out = Vec::new();
        for active in set.iter() {
            let Some(template) = auras.get(active.aura.0) else {
                continue;
            };
            for modifier in &template.modifiers {
                if let AuraModifier::Stat { stat, amount } = *modifier {
                    out.push(StatModifier::flat(stat, amount * active.stacks as f64));
                }
            }
        }
        out
    }
}

/// Caster-side numbers captured for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    pub spell_power: f64,
    pub attack_power: f64,
    pub crit_percent: f64,
    pub damage_done_percent: f64,
    pub damage_multiplier: f64,
    pub mastery: f64,
}

impl Default for ModifierSnapshot {
    fn default() -> Self {
        ModifierSnapshot {
            spell_power: 0.0,
            attack_power: 0.0,
            crit_percent: 0.0,
            damage_done_percent: 0.0,
            damage_multiplier: 1.0,
            mastery: 0.0,
        }
    }
}

impl ModifierSnapshot {
    pub fn capture(derived: &DerivedStats, totals: &ModifierTotals) -> Self {
        ModifierSnapshot {
            spell_power: derived.spell_power,
            attack_power: derived.attack_power,
            crit_percent: derived.crit_percent + totals.crit_percent,
            damage_done_percent: totals.damage_done_percent,
            damage_multiplier: totals.damage_multiplier,
            mastery: derived.mastery,
        }
    }

    pub fn scaling(&self, stat: ScalingStat) -> f64 {
        match stat {
            ScalingStat::SpellPower => self.spell_power,
            ScalingStat::AttackPower => self.attack_power,
            ScalingStat::None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::StackPolicy;
    use crate::types::{ActorId, AuraId, StatKind};
    use std::time::Duration;

    fn templates() -> Vec<Aura> {
        vec![
            Aura {
                id: AuraId(0),
                name: "fire_power".to_string(),
                duration: None,
                max_stacks: 3,
                stacking: StackPolicy::Stack,
                modifiers: vec![
                    AuraModifier::DamageDone {
                        percent: 10.0,
                        school: Some(SpellSchool::Fire),
                    },
                    AuraModifier::Stat {
                        stat: StatKind::SpellPower,
                        amount: 100.0,
                    },
                ],
                periodic: None,
            },
            Aura {
                id: AuraId(1),
                name: "dark_soul".to_string(),
                duration: Some(Duration::from_secs(20)),
                max_stacks: 1,
                stacking: StackPolicy::Refresh,
                modifiers: vec![
                    AuraModifier::Haste { percent: 30.0 },
                    AuraModifier::DamageMultiplier {
                        percent: 20.0,
                        school: None,
                    },
                ],
                periodic: None,
            },
        ]
    }

    #[test]
    fn test_totals_scale_with_stacks_and_school() {
        let auras = templates();
        let mut set = AuraSet::new();
        set.apply(&auras[0], ActorId::PLAYER, Duration::ZERO);
        set.apply(&auras[0], ActorId::PLAYER, Duration::ZERO);
        set.apply(&auras[1], ActorId::PLAYER, Duration::ZERO);

        let fire = ModifierTotals::collect(&set, &auras, Some(SpellSchool::Fire));
        assert!((fire.damage_done_percent - 20.0).abs() < 1e-9);
        assert!((fire.damage_multiplier - 1.2).abs() < 1e-9);
        assert!((fire.haste_multiplier - 1.3).abs() < 1e-9);

        let shadow = ModifierTotals::collect(&set, &auras, Some(SpellSchool::Shadow));
        assert_eq!(shadow.damage_done_percent, 0.0);

        let stats = ModifierTotals::stat_modifiers(&set, &auras);
        assert_eq!(stats.len(), 1);
        assert!((stats[0].value - 200.0).abs() < 1e-9);
    }
}
