//! StatAccumulator - Collects stat modifications before applying to StatBlock

use super::{StatBlock, StatValue};
use crate::types::{ModifierKind, StatKind, StatModifier};
use std::collections::BTreeMap;

/// Accumulates stat modifications from various sources
///
/// This is used while building a StatBlock to collect every source's
/// contribution before folding them into the final values.
#[derive(Debug, Clone, Default)]
pub struct StatAccumulator {
    entries: BTreeMap<StatKind, StatValue>,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, modifier: &StatModifier) {
        self.entry(modifier.stat).add(modifier.kind, modifier.value);
    }

    pub fn add_flat(&mut self, stat: StatKind, value: f64) {
        self.entry(stat).add(ModifierKind::Flat, value);
    }

    pub fn add_increased(&mut self, stat: StatKind, value: f64) {
        self.entry(stat).add(ModifierKind::Increased, value);
    }

    pub fn add_more(&mut self, stat: StatKind, value: f64) {
        self.entry(stat).add(ModifierKind::More, value);
    }

    /// Accumulated contribution for one stat, if any source touched it
    pub fn get(&self, stat: StatKind) -> Option<&StatValue> {
        self.entries.get(&stat)
    }

    /// Apply accumulated stats to a stat block
    pub fn apply_to(&self, block: &mut StatBlock) {
        for (stat, value) in &self.entries {
            block.stat_mut(*stat).merge(value);
        }
    }

    fn entry(&mut self, stat: StatKind) -> &mut StatValue {
        self.entries.entry(stat).or_default()
    }
}
