//! Core types shared across the simulator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic school of a spell or periodic effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    Physical,
    Arcane,
    Fire,
    Frost,
    Holy,
    Nature,
    Shadow,
}

impl SpellSchool {
    /// Physical damage is mitigated by armor, everything else is not
    pub fn is_physical(self) -> bool {
        self == SpellSchool::Physical
    }
}

/// Outcome of a single attack-table roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Miss,
    Dodge,
    Parry,
    Block,
    Crit,
    Hit,
}

impl OutcomeKind {
    /// Whether the action connected with its target
    pub fn landed(self) -> bool {
        matches!(self, OutcomeKind::Block | OutcomeKind::Crit | OutcomeKind::Hit)
    }

    pub fn is_crit(self) -> bool {
        self == OutcomeKind::Crit
    }
}

/// Kinds of spendable/regenerating resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Mana,
    Energy,
    Rage,
    Focus,
    ComboPoints,
    BurningEmbers,
    HolyPower,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Mana => "mana",
            ResourceKind::Energy => "energy",
            ResourceKind::Rage => "rage",
            ResourceKind::Focus => "focus",
            ResourceKind::ComboPoints => "combo_points",
            ResourceKind::BurningEmbers => "burning_embers",
            ResourceKind::HolyPower => "holy_power",
        };
        f.write_str(name)
    }
}

/// Stats that gear, talents and auras can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Strength,
    Agility,
    Intellect,
    Stamina,
    SpellPower,
    AttackPower,
    CritRating,
    HasteRating,
    HitRating,
    ExpertiseRating,
    MasteryRating,
    Armor,
    Health,
    Mana,
}

/// How a stat modifier combines with the rest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    #[default]
    Flat,
    Increased,
    More,
}

/// A single stat contribution from gear, talents or base stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKind,
    pub value: f64,
    #[serde(default)]
    pub kind: ModifierKind,
}

impl StatModifier {
    pub fn flat(stat: StatKind, value: f64) -> Self {
        StatModifier {
            stat,
            value,
            kind: ModifierKind::Flat,
        }
    }
}

/// Equipment slot for gear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Head,
    Neck,
    Shoulders,
    Back,
    Chest,
    Wrist,
    Hands,
    Waist,
    Legs,
    Feet,
    Finger1,
    Finger2,
    Trinket1,
    Trinket2,
    MainHand,
    OffHand,
}

/// Index of a combatant inside one trial. The player is always actor 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub usize);

impl ActorId {
    pub const PLAYER: ActorId = ActorId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a spell in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpellId(pub usize);

/// Index of an aura template in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuraId(pub usize);

/// Which unit an aura lookup or application refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Player,
    Target,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landed_outcomes() {
        assert!(OutcomeKind::Hit.landed());
        assert!(OutcomeKind::Crit.landed());
        assert!(OutcomeKind::Block.landed());
        assert!(!OutcomeKind::Miss.landed());
        assert!(!OutcomeKind::Dodge.landed());
        assert!(!OutcomeKind::Parry.landed());
    }

    #[test]
    fn test_stat_modifier_defaults_to_flat() {
        let modifier: StatModifier = toml::from_str("stat = \"crit_rating\"\nvalue = 600.0").unwrap();
        assert_eq!(modifier.kind, ModifierKind::Flat);
        assert_eq!(modifier.stat, StatKind::CritRating);
    }

    #[test]
    fn test_resource_display() {
        assert_eq!(ResourceKind::BurningEmbers.to_string(), "burning_embers");
    }
}
