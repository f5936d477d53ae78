//! Character configuration: base stats, gear, talents and resources

use crate::spell::SpellModConfig;
use crate::types::{EquipmentSlot, ResourceKind, StatModifier};
use serde::{Deserialize, Serialize};

/// The simulated player character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub name: String,
    #[serde(default)]
    pub base: BaseStats,
    #[serde(default)]
    pub gear: Vec<GearItem>,
    /// Selected talent ids from the talent catalog
    #[serde(default)]
    pub talents: Vec<String>,
    /// Selected glyph ids from the talent catalog
    #[serde(default)]
    pub glyphs: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    /// Proc triggers active regardless of gear or talents (racials, set bonuses)
    #[serde(default)]
    pub procs: Vec<String>,
    #[serde(default)]
    pub consumables: ConsumablesConfig,
}

/// Naked character stats before gear
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    #[serde(default)]
    pub strength: f64,
    #[serde(default)]
    pub agility: f64,
    #[serde(default)]
    pub intellect: f64,
    #[serde(default)]
    pub stamina: f64,
    #[serde(default = "default_health")]
    pub health: f64,
    #[serde(default = "default_mana")]
    pub mana: f64,
}

impl Default for BaseStats {
    fn default() -> Self {
        BaseStats {
            strength: 0.0,
            agility: 0.0,
            intellect: 0.0,
            stamina: 0.0,
            health: default_health(),
            mana: default_mana(),
        }
    }
}

fn default_health() -> f64 {
    100_000.0
}
fn default_mana() -> f64 {
    60_000.0
}

/// An equipped item: a bag of stat modifiers plus optional item effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearItem {
    pub name: String,
    pub slot: EquipmentSlot,
    #[serde(default)]
    pub stats: Vec<StatModifier>,
    /// Proc trigger ids this item enables
    #[serde(default)]
    pub procs: Vec<String>,
}

/// Flask and food: stat buffs eaten before the pull that last the whole
/// encounter. Potions are ordinary spells sharing a cooldown group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumablesConfig {
    #[serde(default)]
    pub flask: Option<Consumable>,
    #[serde(default)]
    pub food: Option<Consumable>,
}

impl ConsumablesConfig {
    pub fn iter(&self) -> impl Iterator<Item = &Consumable> {
        self.flask.iter().chain(self.food.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumable {
    pub name: String,
    #[serde(default)]
    pub stats: Vec<StatModifier>,
}

/// A resource pool the character starts the encounter with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub kind: ResourceKind,
    /// Pool size; mana defaults to the character's max mana
    #[serde(default)]
    pub max: Option<f64>,
    /// Starting value; defaults to full
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub regen_per_second: f64,
}

/// A talent or glyph: stat contributions, spell modifiers and procs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalentConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: Vec<StatModifier>,
    #[serde(default)]
    pub spell_mods: Vec<SpellModConfig>,
    #[serde(default)]
    pub procs: Vec<String>,
}
