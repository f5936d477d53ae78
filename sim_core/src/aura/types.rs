//! Aura type definitions

use super::ModifierPolicy;
use crate::config::{opt_secs, secs};
use crate::spell::ScalingStat;
use crate::types::{AuraId, SpellSchool, StatKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens when an aura is applied to a unit that already has it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackPolicy {
    /// Reset the duration, leave stacks alone
    #[default]
    Refresh,
    /// Add a stack up to the maximum, leave the duration alone
    Stack,
    /// Add a stack and reset the duration
    RefreshAndStack,
}

impl StackPolicy {
    pub fn refreshes(self) -> bool {
        matches!(self, StackPolicy::Refresh | StackPolicy::RefreshAndStack)
    }

    pub fn stacks(self) -> bool {
        matches!(self, StackPolicy::Stack | StackPolicy::RefreshAndStack)
    }
}

/// A modifier granted by an aura. Values scale with the stack count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuraModifier {
    /// Additive damage-done bonus in percent
    DamageDone {
        percent: f64,
        #[serde(default)]
        school: Option<SpellSchool>,
    },
    /// Independent damage multiplier in percent (10.0 = ×1.10)
    DamageMultiplier {
        percent: f64,
        #[serde(default)]
        school: Option<SpellSchool>,
    },
    CritChance { percent: f64 },
    Haste { percent: f64 },
    Stat { stat: StatKind, amount: f64 },
    /// Damage taken by the aura's owner, in percent
    DamageTaken {
        percent: f64,
        #[serde(default)]
        school: Option<SpellSchool>,
    },
}

/// Damage or healing dealt every interval while the aura is up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicConfig {
    #[serde(with = "secs")]
    pub interval: Duration,
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub scales_with: ScalingStat,
    #[serde(default = "default_school")]
    pub school: SpellSchool,
    #[serde(default)]
    pub heal: bool,
    #[serde(default)]
    pub can_crit: bool,
    #[serde(default)]
    pub policy: ModifierPolicy,
    /// Percent per point of the source's mastery
    #[serde(default)]
    pub mastery_scaling: f64,
}

fn default_school() -> SpellSchool {
    SpellSchool::Physical
}

/// Aura template as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `None` lasts until the end of the encounter
    #[serde(default, with = "opt_secs")]
    pub duration: Option<Duration>,
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    #[serde(default)]
    pub stacking: StackPolicy,
    #[serde(default)]
    pub modifiers: Vec<AuraModifier>,
    #[serde(default)]
    pub periodic: Option<PeriodicConfig>,
}

fn default_max_stacks() -> u32 {
    1
}

/// Validated aura template, shared read-only across trials
#[derive(Debug, Clone)]
pub struct Aura {
    pub id: AuraId,
    pub name: String,
    pub duration: Option<Duration>,
    pub max_stacks: u32,
    pub stacking: StackPolicy,
    pub modifiers: Vec<AuraModifier>,
    pub periodic: Option<PeriodicConfig>,
}

impl Aura {
    /// Whether any modifier changes the owner's stat block
    pub fn touches_stats(&self) -> bool {
        self.modifiers
            .iter()
            .any(|m| matches!(m, AuraModifier::Stat { .. } | AuraModifier::Haste { .. }))
    }
}
