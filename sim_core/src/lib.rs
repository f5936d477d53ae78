//! sim_core - Discrete-event combat rotation simulator
//!
//! This library provides:
//! - Registry: validated, read-only spell/aura/proc/rotation templates
//! - Trial: one seeded run of a character against an encounter
//! - Aggregator: many trials in parallel, merged into mean, standard error
//!   and confidence bounds
//! - APL: typed rotation conditions compiled from configuration

pub mod actor;
pub mod aggregate;
pub mod apl;
pub mod aura;
pub mod bus;
pub mod config;
pub mod defense;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod random;
pub mod registry;
pub mod resource;
pub mod scheduler;
pub mod source;
pub mod spell;
pub mod stat_block;
pub mod trial;
pub mod types;

// Re-export core types for convenience
pub use aggregate::{
    run_simulation, run_simulation_with_cancel, run_single_trial, CancelToken, Convergence, SimOptions,
    SimulationResult, Summary, TrialFailure,
};
pub use config::{demo_config, load_toml, parse_json, parse_toml, ConfigError, SimConfig};
pub use error::SimError;
pub use metrics::{LogEntry, SpellBreakdown, TrialMetrics};
pub use registry::Registry;
pub use stat_block::{StatAccumulator, StatBlock, StatValue};
pub use trial::{run_trial, Trial, TrialOutcome};
pub use types::{ActorId, AuraId, OutcomeKind, ResourceKind, SpellId, SpellSchool, StatKind};
