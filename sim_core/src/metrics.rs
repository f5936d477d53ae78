//! Per-trial metrics and the optional combat log

use crate::types::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Damage and cast breakdown of a single spell or periodic effect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellBreakdown {
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub ticks: u64,
    pub damage: f64,
    pub healing: f64,
}

/// Totals of one trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialMetrics {
    pub seed: u64,
    /// Simulated length of the trial
    #[serde(with = "crate::config::secs")]
    pub duration: Duration,
    pub total_damage: f64,
    pub total_healing: f64,
    pub overhealing: f64,
    pub damage_taken: f64,
    pub resource_spent: BTreeMap<ResourceKind, f64>,
    pub resource_gained: BTreeMap<ResourceKind, f64>,
    pub casts: u64,
    pub rejections: u64,
    pub events: u64,
    pub spells: BTreeMap<String, SpellBreakdown>,
    /// Activations per proc
    pub procs: BTreeMap<String, u64>,
    #[serde(default, with = "crate::config::opt_secs")]
    pub target_killed_at: Option<Duration>,
}

impl TrialMetrics {
    pub fn new(seed: u64) -> Self {
        TrialMetrics {
            seed,
            ..Default::default()
        }
    }

    pub fn dps(&self) -> f64 {
        per_second(self.total_damage, self.duration)
    }

    pub fn hps(&self) -> f64 {
        per_second(self.total_healing, self.duration)
    }

    /// Damage taken per second
    pub fn dtps(&self) -> f64 {
        per_second(self.damage_taken, self.duration)
    }

    pub fn spell_mut(&mut self, name: &str) -> &mut SpellBreakdown {
        self.spells.entry(name.to_string()).or_default()
    }

    pub fn record_spent(&mut self, kind: ResourceKind, amount: f64) {
        *self.resource_spent.entry(kind).or_insert(0.0) += amount;
    }

    pub fn record_gained(&mut self, kind: ResourceKind, amount: f64) {
        *self.resource_gained.entry(kind).or_insert(0.0) += amount;
    }
}

fn per_second(amount: f64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds <= 0.0 {
        return 0.0;
    }
    amount / seconds
}

/// One line of the combat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "crate::config::secs")]
    pub time: Duration,
    pub actor: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut metrics = TrialMetrics::new(1);
        metrics.duration = Duration::from_secs(60);
        metrics.total_damage = 120_000.0;
        metrics.total_healing = 6_000.0;
        assert!((metrics.dps() - 2000.0).abs() < 1e-9);
        assert!((metrics.hps() - 100.0).abs() < 1e-9);
        assert_eq!(TrialMetrics::new(1).dps(), 0.0);
    }

    #[test]
    fn test_breakdown_and_resources() {
        let mut metrics = TrialMetrics::new(1);
        metrics.spell_mut("incinerate").casts += 2;
        metrics.spell_mut("incinerate").damage += 500.0;
        metrics.record_spent(ResourceKind::BurningEmbers, 10.0);
        metrics.record_spent(ResourceKind::BurningEmbers, 10.0);
        assert_eq!(metrics.spells["incinerate"].casts, 2);
        assert_eq!(metrics.resource_spent[&ResourceKind::BurningEmbers], 20.0);
    }
}
