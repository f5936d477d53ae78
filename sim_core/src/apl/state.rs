//! Read-only view of combat state used by rotation conditions

use crate::stat_block::DerivedStat;
use crate::types::{AuraId, ResourceKind, SpellId, Unit};
use std::time::Duration;

/// Live state a condition can read at a decision point
pub trait SimState {
    fn now(&self) -> Duration;
    /// Time left in the encounter
    fn remaining_time(&self) -> Duration;
    fn resource(&self, kind: ResourceKind) -> f64;
    /// Pool fill in percent (0 to 100)
    fn resource_percent(&self, kind: ResourceKind) -> f64;
    fn cooldown_remaining(&self, spell: SpellId) -> Duration;
    /// Off cooldown and affordable
    fn is_ready(&self, spell: SpellId) -> bool;
    fn gcd_remaining(&self) -> Duration;
    fn is_casting(&self) -> bool;
    fn remaining_cast_time(&self) -> Duration;
    fn aura_active(&self, unit: Unit, aura: AuraId) -> bool;
    fn aura_stacks(&self, unit: Unit, aura: AuraId) -> u32;
    fn aura_remaining(&self, unit: Unit, aura: AuraId) -> Duration;
    /// Primary target health in percent; 100 for targets that cannot die
    fn target_health_percent(&self) -> f64;
    /// The player's current derived stat, auras included
    fn stat(&self, stat: DerivedStat) -> f64;
}
