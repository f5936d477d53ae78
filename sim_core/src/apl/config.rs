//! Rotation configuration as written in TOML/JSON

use crate::config::secs;
use crate::stat_block::DerivedStat;
use crate::types::{ResourceKind, Unit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    pub fn apply<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A value node of a rotation condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueConfig {
    Bool {
        value: bool,
    },
    Number {
        value: f64,
    },
    Duration {
        #[serde(with = "secs")]
        seconds: Duration,
    },
    String {
        value: String,
    },
    CurrentTime,
    RemainingTime,
    CurrentResource {
        resource: ResourceKind,
    },
    ResourcePercent {
        resource: ResourceKind,
    },
    CooldownRemaining {
        spell: String,
    },
    IsReady {
        spell: String,
    },
    GcdRemaining,
    IsCasting,
    RemainingCastTime,
    AuraActive {
        aura: String,
        #[serde(default)]
        on: Unit,
    },
    AuraStacks {
        aura: String,
        #[serde(default)]
        on: Unit,
    },
    AuraRemaining {
        aura: String,
        #[serde(default)]
        on: Unit,
    },
    TargetHealthPercent,
    Stat {
        stat: DerivedStat,
    },
    Not {
        value: Box<ValueConfig>,
    },
    And {
        values: Vec<ValueConfig>,
    },
    Or {
        values: Vec<ValueConfig>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    Math {
        op: MathOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    Min {
        values: Vec<ValueConfig>,
    },
    Max {
        values: Vec<ValueConfig>,
    },
}

/// What a rule does when its condition holds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    Cast {
        spell: String,
    },
    /// Stop evaluating and come back after this long
    Wait {
        #[serde(with = "secs")]
        seconds: Duration,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Absent means always true
    #[serde(default)]
    pub condition: Option<ValueConfig>,
    pub action: ActionConfig,
}

/// Priority list: the first rule whose condition holds and whose action
/// succeeds wins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Casts made before the pull, in any order
    #[serde(default)]
    pub prepull: Vec<PrepullConfig>,
}

/// A spell cast `lead` seconds before the encounter starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepullConfig {
    pub spell: String,
    #[serde(with = "secs")]
    pub lead: Duration,
}
