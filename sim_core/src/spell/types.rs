//! Spell templates as configured and as compiled

use crate::apl::{secs_to_duration, Value, ValueConfig};
use crate::aura::ModifierPolicy;
use crate::config::{opt_secs, secs};
use crate::resource::ResourceCost;
use crate::types::{AuraId, SpellId, SpellSchool, Unit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a spell does to its targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    #[default]
    Damage,
    Heal,
    /// No direct magnitude (buffs, resource generators)
    None,
}

/// Which caster stat the coefficient multiplies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStat {
    #[default]
    SpellPower,
    AttackPower,
    None,
}

/// Outcome table a spell rolls against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTableKind {
    /// Miss then crit
    #[default]
    Spell,
    /// Miss, dodge, parry, block then crit
    Melee,
    /// Crit only (heals, periodic effects, unmissable abilities)
    AlwaysHit,
}

/// `min..=max + coefficient × stat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(default)]
    pub min: f64,
    /// Defaults to `min` when absent or lower
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub scales_with: ScalingStat,
}

impl Formula {
    pub fn upper(&self) -> f64 {
        self.max.unwrap_or(self.min).max(self.min)
    }
}

/// Aura applied by a spell when it lands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraApplicationConfig {
    pub aura: String,
    #[serde(default = "default_unit_target")]
    pub on: Unit,
}

fn default_unit_target() -> Unit {
    Unit::Target
}

/// A spell template as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_school")]
    pub school: SpellSchool,
    #[serde(default, with = "secs")]
    pub cast_time: Duration,
    #[serde(default = "default_true")]
    pub on_gcd: bool,
    /// Overrides the base global cooldown
    #[serde(default, with = "opt_secs")]
    pub gcd: Option<Duration>,
    #[serde(default, with = "secs")]
    pub cooldown: Duration,
    /// Spells in the same group start each other's cooldown (potions)
    #[serde(default)]
    pub cooldown_group: Option<String>,
    #[serde(default)]
    pub cost: Option<ResourceCost>,
    /// Resource gained when the spell lands
    #[serde(default)]
    pub generates: Option<ResourceCost>,
    #[serde(default)]
    pub effect: EffectKind,
    #[serde(default)]
    pub formula: Formula,
    #[serde(default)]
    pub table: OutcomeTableKind,
    #[serde(default = "default_true")]
    pub can_crit: bool,
    /// Overrides the base critical strike multiplier
    #[serde(default)]
    pub crit_multiplier: Option<f64>,
    #[serde(default)]
    pub policy: ModifierPolicy,
    /// Projectile speed in yards per second; `None` lands instantly
    #[serde(default)]
    pub missile_speed: Option<f64>,
    /// Hits every living target instead of the selected one
    #[serde(default)]
    pub aoe: bool,
    /// Percent damage or healing per point of mastery
    #[serde(default)]
    pub mastery_scaling: f64,
    #[serde(default)]
    pub applies_aura: Option<AuraApplicationConfig>,
    /// Extra castability condition on top of cooldown, cost and casting state
    #[serde(default)]
    pub condition: Option<ValueConfig>,
}

fn default_school() -> SpellSchool {
    SpellSchool::Physical
}

fn default_true() -> bool {
    true
}

/// Permanent spell modifier kinds (talents, glyphs, tuning passes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellModKind {
    DamageDonePercent,
    CritPercent,
    CostPercent,
    CastTimePercent,
}

/// Permanent modifier scoped to spells and/or a school; unscoped applies to all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellModConfig {
    pub kind: SpellModKind,
    pub value: f64,
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub school: Option<SpellSchool>,
}

impl SpellModConfig {
    pub fn applies_to(&self, spell: &SpellConfig) -> bool {
        let by_id = self.spells.is_empty() || self.spells.iter().any(|s| s == &spell.id);
        let by_school = self.school.map_or(true, |s| s == spell.school);
        by_id && by_school
    }
}

/// Static modifiers baked into a compiled spell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StaticMods {
    pub damage_percent: f64,
    pub crit_percent: f64,
}

/// Validated spell template, shared read-only across trials
#[derive(Debug, Clone)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    pub school: SpellSchool,
    pub cast_time: Duration,
    pub on_gcd: bool,
    pub gcd: Option<Duration>,
    pub cooldown: Duration,
    /// Other members of this spell's cooldown group
    pub shared_cooldown: Vec<SpellId>,
    pub cost: Option<ResourceCost>,
    pub generates: Option<ResourceCost>,
    pub effect: EffectKind,
    pub formula: Formula,
    pub table: OutcomeTableKind,
    pub can_crit: bool,
    pub crit_multiplier: Option<f64>,
    pub policy: ModifierPolicy,
    pub missile_speed: Option<f64>,
    pub aoe: bool,
    pub mastery_scaling: f64,
    pub applies_aura: Option<(AuraId, Unit)>,
    pub condition: Option<Value>,
    pub mods: StaticMods,
}

impl Spell {
    pub fn is_instant(&self) -> bool {
        self.cast_time.is_zero()
    }

    /// Flight time to a target `distance` yards away
    pub fn travel_time(&self, distance: f64) -> Duration {
        match self.missile_speed {
            Some(speed) if speed > 0.0 && distance > 0.0 => secs_to_duration(distance / speed),
            _ => Duration::ZERO,
        }
    }
}
