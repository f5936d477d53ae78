//! Prelude module for convenient imports
//!
//! ```rust
//! use sim_core::prelude::*;
//! ```

// Running simulations
pub use crate::aggregate::{run_simulation, run_simulation_with_cancel, run_single_trial, CancelToken, SimOptions};
pub use crate::trial::{Trial, TrialOutcome};

// Configuration
pub use crate::config::{demo_config, load_toml, parse_toml, SimConfig};
pub use crate::registry::Registry;

// Results
pub use crate::aggregate::{Convergence, SimulationResult, Summary};
pub use crate::metrics::{LogEntry, TrialMetrics};

// Errors
pub use crate::config::ConfigError;
pub use crate::error::SimError;

// Core types
pub use crate::spell::{Attempt, RejectReason};
pub use crate::types::{ActorId, ResourceKind, SpellSchool, Unit};
