//! Aggregator - runs many independent trials and merges their metrics
//!
//! Trials run in parallel batches on rayon's pool. Each trial gets its own
//! seed derived from the base seed and its index, and results are merged in
//! index order, so a run is reproducible regardless of the thread count.

mod stats;

pub use stats::{RunningStats, Summary, Z_95};

use crate::config::{ConfigError, SimConfig};
use crate::error::SimError;
use crate::metrics::{LogEntry, TrialMetrics};
use crate::random::trial_seed;
use crate::registry::Registry;
use crate::trial::{run_trial, TrialOutcome};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Run-level options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimOptions {
    /// Trial budget
    pub iterations: usize,
    /// Base seed; trial seeds derive from it
    pub seed: u64,
    /// Worker threads; `None` uses rayon's global pool
    #[serde(default)]
    pub threads: Option<usize>,
    /// Stop once the 95% interval of mean DPS is within this fraction of
    /// the mean (0.005 = ±0.5%)
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    /// Trials per batch between convergence and cancellation checks
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Keep combat logs of the first `log_trials` trials
    #[serde(default)]
    pub keep_logs: bool,
    #[serde(default = "default_log_trials")]
    pub log_trials: usize,
}

fn default_batch_size() -> usize {
    64
}

fn default_log_trials() -> usize {
    1
}

impl Default for SimOptions {
    fn default() -> Self {
        SimOptions {
            iterations: 1000,
            seed: 0,
            threads: None,
            confidence_threshold: None,
            batch_size: default_batch_size(),
            keep_logs: false,
            log_trials: default_log_trials(),
        }
    }
}

/// Shared flag to stop a run between trials
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// No confidence threshold was set
    NotRequested,
    Converged,
    /// The budget ran out before the threshold was met
    Degraded,
}

/// A trial abandoned because engine state became inconsistent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialFailure {
    pub index: usize,
    pub seed: u64,
    #[serde(with = "crate::config::secs")]
    pub time: Duration,
    pub actor: String,
    pub action: String,
    pub message: String,
}

/// Per-spell means across trials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellSummary {
    pub casts: f64,
    pub hits: f64,
    pub crits: f64,
    pub ticks: f64,
    pub damage: f64,
    pub healing: f64,
    /// Fraction of total damage
    pub damage_share: f64,
}

/// Combat log of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialLog {
    pub index: usize,
    pub seed: u64,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Trials that completed without failure
    pub iterations: u64,
    pub dps: Summary,
    pub hps: Summary,
    pub dtps: Summary,
    pub duration: Summary,
    pub casts: Summary,
    pub spells: BTreeMap<String, SpellSummary>,
    pub procs: BTreeMap<String, f64>,
    pub convergence: Convergence,
    pub cancelled: bool,
    pub failures: Vec<TrialFailure>,
    pub logs: Vec<TrialLog>,
}

/// Fold of trial metrics, merged in trial order
#[derive(Default)]
struct Accumulator {
    dps: RunningStats,
    hps: RunningStats,
    dtps: RunningStats,
    duration: RunningStats,
    casts: RunningStats,
    spells: BTreeMap<String, SpellSummary>,
    procs: BTreeMap<String, f64>,
    total_damage: f64,
    failures: Vec<TrialFailure>,
    logs: Vec<TrialLog>,
}

impl Accumulator {
    fn add(&mut self, metrics: &TrialMetrics) {
        self.dps.push(metrics.dps());
        self.hps.push(metrics.hps());
        self.dtps.push(metrics.dtps());
        self.duration.push(metrics.duration.as_secs_f64());
        self.casts.push(metrics.casts as f64);
        self.total_damage += metrics.total_damage;
        for (name, spell) in &metrics.spells {
            let sum = self.spells.entry(name.clone()).or_default();
            sum.casts += spell.casts as f64;
            sum.hits += spell.hits as f64;
            sum.crits += spell.crits as f64;
            sum.ticks += spell.ticks as f64;
            sum.damage += spell.damage;
            sum.healing += spell.healing;
        }
        for (name, count) in &metrics.procs {
            *self.procs.entry(name.clone()).or_insert(0.0) += *count as f64;
        }
    }

    fn finish(self, convergence: Convergence, cancelled: bool) -> SimulationResult {
        let n = self.dps.count().max(1) as f64;
        let total_damage = self.total_damage;
        let spells = self
            .spells
            .into_iter()
            .map(|(name, sum)| {
                let share = if total_damage > 0.0 { sum.damage / total_damage } else { 0.0 };
                let mean = SpellSummary {
                    casts: sum.casts / n,
                    hits: sum.hits / n,
                    crits: sum.crits / n,
                    ticks: sum.ticks / n,
                    damage: sum.damage / n,
                    healing: sum.healing / n,
                    damage_share: share,
                };
                (name, mean)
            })
            .collect();
        let procs = self.procs.into_iter().map(|(name, count)| (name, count / n)).collect();

        SimulationResult {
            iterations: self.dps.count(),
            dps: self.dps.summary(),
            hps: self.hps.summary(),
            dtps: self.dtps.summary(),
            duration: self.duration.summary(),
            casts: self.casts.summary(),
            spells,
            procs,
            convergence,
            cancelled,
            failures: self.failures,
            logs: self.logs,
        }
    }
}

/// Run `trials` trials with default options
pub fn run_simulation(config: &SimConfig, trials: usize) -> Result<SimulationResult, SimError> {
    let options = SimOptions {
        iterations: trials,
        ..Default::default()
    };
    run_simulation_with_cancel(config, &options, &CancelToken::new())
}

/// Run a simulation that can be stopped between trials through `cancel`.
/// Trials already running when the token is set still complete.
pub fn run_simulation_with_cancel(
    config: &SimConfig,
    options: &SimOptions,
    cancel: &CancelToken,
) -> Result<SimulationResult, SimError> {
    let registry = Registry::build(config).map_err(|e| {
        debug!(error = %e, "configuration rejected");
        SimError::from(e)
    })?;
    if options.batch_size == 0 {
        return Err(ConfigError::ValidationError("batch_size must be positive".to_string()).into());
    }

    match options.threads {
        Some(threads) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| SimError::ThreadPool(e.to_string()))?;
            pool.install(|| run_batches(&registry, options, cancel))
        }
        None => run_batches(&registry, options, cancel),
    }
}

fn run_batches(registry: &Registry, options: &SimOptions, cancel: &CancelToken) -> Result<SimulationResult, SimError> {
    let started = Instant::now();
    info!(
        character = %registry.player.name,
        iterations = options.iterations,
        seed = options.seed,
        threshold = ?options.confidence_threshold,
        "simulation started"
    );

    let mut acc = Accumulator::default();
    let mut next = 0;
    let mut convergence = match options.confidence_threshold {
        Some(_) => Convergence::Degraded,
        None => Convergence::NotRequested,
    };
    let mut cancelled = false;

    while next < options.iterations {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        let end = (next + options.batch_size).min(options.iterations);
        let batch: Vec<(usize, u64, Option<Result<TrialOutcome, SimError>>)> = (next..end)
            .into_par_iter()
            .map(|index| {
                let seed = trial_seed(options.seed, index as u64);
                if cancel.is_cancelled() {
                    return (index, seed, None);
                }
                let keep_log = options.keep_logs && index < options.log_trials;
                (index, seed, Some(run_trial(registry, seed, keep_log)))
            })
            .collect();

        for (index, seed, outcome) in batch {
            match outcome {
                None => cancelled = true,
                Some(Ok(outcome)) => {
                    acc.add(&outcome.metrics);
                    if let Some(entries) = outcome.log {
                        acc.logs.push(TrialLog { index, seed, entries });
                    }
                }
                Some(Err(SimError::Invariant {
                    seed,
                    time,
                    actor,
                    action,
                    detail,
                })) => {
                    warn!(index, seed, ?time, %actor, %action, %detail, "trial failed");
                    acc.failures.push(TrialFailure {
                        index,
                        seed,
                        time,
                        actor,
                        action,
                        message: detail,
                    });
                }
                Some(Err(other)) => return Err(other),
            }
        }
        next = end;
        if cancelled {
            break;
        }

        if let Some(threshold) = options.confidence_threshold {
            // At least two batches and two successful trials before trusting the interval
            let enough = next >= options.batch_size * 2 && acc.dps.count() >= 2;
            if enough && acc.dps.relative_half_width() <= threshold {
                convergence = Convergence::Converged;
                break;
            }
        }
    }

    let result = acc.finish(convergence, cancelled);
    info!(
        iterations = result.iterations,
        failures = result.failures.len(),
        dps = result.dps.mean,
        std_err = result.dps.std_err,
        convergence = ?result.convergence,
        cancelled = result.cancelled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation finished"
    );
    Ok(result)
}

/// Run one trial with a combat log, for regression diffs
pub fn run_single_trial(config: &SimConfig, seed: u64) -> Result<TrialOutcome, SimError> {
    let registry = Registry::build(config)?;
    run_trial(&registry, seed, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_toml;

    const CONFIG: &str = r#"
[character]
name = "Tester"

[character.base]
intellect = 1000.0

[[spells]]
id = "bolt"
school = "fire"
formula = { min = 900.0, max = 1100.0, coefficient = 0.5 }

[rotation]
rules = [{ action = { type = "cast", spell = "bolt" } }]

[encounter]
duration = 30.0
duration_variation = 5.0
"#;

    fn config() -> SimConfig {
        parse_toml(CONFIG).unwrap()
    }

    #[test]
    fn test_results_do_not_depend_on_thread_count() {
        let mut options = SimOptions {
            iterations: 40,
            seed: 11,
            batch_size: 16,
            threads: Some(1),
            ..Default::default()
        };
        let single = run_simulation_with_cancel(&config(), &options, &CancelToken::new()).unwrap();
        options.threads = Some(4);
        let parallel = run_simulation_with_cancel(&config(), &options, &CancelToken::new()).unwrap();
        assert_eq!(single.iterations, 40);
        assert_eq!(single.dps, parallel.dps);
        assert_eq!(single.spells, parallel.spells);
    }

    #[test]
    fn test_convergence_stops_early() {
        let options = SimOptions {
            iterations: 10_000,
            seed: 3,
            batch_size: 32,
            confidence_threshold: Some(0.05),
            ..Default::default()
        };
        let result = run_simulation_with_cancel(&config(), &options, &CancelToken::new()).unwrap();
        assert_eq!(result.convergence, Convergence::Converged);
        assert!(result.iterations < 10_000);
        assert!(result.dps.std_err > 0.0);
    }

    #[test]
    fn test_impossible_threshold_is_degraded_not_failed() {
        let options = SimOptions {
            iterations: 20,
            batch_size: 10,
            confidence_threshold: Some(0.0),
            ..Default::default()
        };
        let result = run_simulation_with_cancel(&config(), &options, &CancelToken::new()).unwrap();
        assert_eq!(result.convergence, Convergence::Degraded);
        assert_eq!(result.iterations, 20);
    }

    #[test]
    fn test_failed_trials_never_converge() {
        let mut config = config();
        config.spells[0].on_gcd = false;
        let options = SimOptions {
            iterations: 8,
            batch_size: 2,
            confidence_threshold: Some(0.01),
            ..Default::default()
        };
        let result = run_simulation_with_cancel(&config, &options, &CancelToken::new()).unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.failures.len(), 8);
        assert_eq!(result.convergence, Convergence::Degraded);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = run_simulation_with_cancel(&config(), &SimOptions::default(), &cancel).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_config_error_is_fatal() {
        let mut config = config();
        config.rotation.rules.clear();
        let err = run_simulation(&config, 10).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_logs_kept_for_first_trials() {
        let options = SimOptions {
            iterations: 8,
            batch_size: 4,
            keep_logs: true,
            log_trials: 2,
            ..Default::default()
        };
        let result = run_simulation_with_cancel(&config(), &options, &CancelToken::new()).unwrap();
        let indices: Vec<usize> = result.logs.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(!result.logs[0].entries.is_empty());
    }
}
