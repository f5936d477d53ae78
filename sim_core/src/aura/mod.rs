//! Aura system - timed buffs, debuffs and periodic effects
//!
//! Aura templates are immutable and shared across trials. Each unit owns an
//! [`AuraSet`] holding at most one [`ActiveAura`] per template; reapplying
//! refreshes and/or stacks the existing instance according to its
//! [`StackPolicy`].

mod active;
mod modifiers;
mod types;

pub use active::{ActiveAura, Application, AuraSet};
pub use modifiers::{ModifierPolicy, ModifierSnapshot, ModifierTotals};
pub use types::{Aura, AuraConfig, AuraModifier, PeriodicConfig, StackPolicy};
