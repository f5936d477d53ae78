//! Results of cast attempts and resolutions

use crate::types::{ActorId, OutcomeKind, SpellId, SpellSchool};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a cast attempt was turned down. Rejection is normal control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    OnCooldown,
    InsufficientResource,
    ConditionFalse,
    BusyCasting,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::OnCooldown => "on cooldown",
            RejectReason::InsufficientResource => "insufficient resource",
            RejectReason::ConditionFalse => "condition false",
            RejectReason::BusyCasting => "busy casting",
        };
        f.write_str(text)
    }
}

/// Outcome of one resolution against one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellResult {
    pub spell: SpellId,
    pub caster: ActorId,
    pub target: ActorId,
    pub school: SpellSchool,
    pub outcome: OutcomeKind,
    /// Formula value before modifiers and mitigation
    pub raw: f64,
    pub amount: f64,
    pub heal: bool,
}

impl SpellResult {
    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }
}

/// Accepted or rejected cast attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Hardcast started; resolves when the cast completes
    Casting { completes_at: Duration },
    /// Instant cast resolved; results with travel time have not landed yet
    Resolved(Vec<SpellResult>),
    Rejected(RejectReason),
}

impl Attempt {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Attempt::Rejected(_))
    }
}
