//! Action priority list - the rotation decision engine
//!
//! A rotation is an ordered list of rules. Conditions are typed value trees
//! compiled once from configuration and evaluated against a [`SimState`]
//! at every decision point.

mod config;
mod state;
mod value;

pub use config::{ActionConfig, CompareOp, MathOp, PrepullConfig, RotationConfig, RuleConfig, ValueConfig};
pub use state::SimState;
pub use value::{Value, ValueType};

pub(crate) use value::secs_to_duration;

use crate::config::ConfigError;
use crate::types::{AuraId, ResourceKind, SpellId};
use std::time::Duration;

/// Name lookups needed to compile configuration references
pub trait NameResolver {
    fn spell(&self, name: &str) -> Option<SpellId>;
    fn aura(&self, name: &str) -> Option<AuraId>;
    fn has_resource(&self, kind: ResourceKind) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Cast(SpellId),
    Wait(Duration),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub condition: Option<Value>,
    pub action: Action,
}

impl Rule {
    pub fn applies(&self, state: &dyn SimState) -> bool {
        self.condition.as_ref().map_or(true, |c| c.eval_bool(state))
    }
}

/// A cast made `lead` before the pull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prepull {
    pub spell: SpellId,
    pub lead: Duration,
}

/// Compiled rotation, shared read-only by every trial
#[derive(Debug, Clone, Default)]
pub struct Rotation {
    pub rules: Vec<Rule>,
    /// Earliest first
    pub prepull: Vec<Prepull>,
}

impl Rotation {
    pub fn compile(config: &RotationConfig, names: &dyn NameResolver) -> Result<Self, ConfigError> {
        if config.rules.is_empty() {
            return Err(ConfigError::ValidationError(
                "rotation has no rules".to_string(),
            ));
        }

        let mut rules = Vec::with_capacity(config.rules.len());
        for (index, rule) in config.rules.iter().enumerate() {
            let context = format!("rule {}", index + 1);
            let condition = match &rule.condition {
                Some(c) => Some(Value::compile_bool(c, names, &context)?),
                None => None,
            };
            let action = match &rule.action {
                ActionConfig::Cast { spell } => Action::Cast(
                    names
                        .spell(spell)
                        .ok_or_else(|| ConfigError::unknown("spell", spell, context.clone()))?,
                ),
                ActionConfig::Wait { seconds } => {
                    if seconds.is_zero() {
                        return Err(ConfigError::ValidationError(format!(
                            "{}: wait must be longer than zero",
                            context
                        )));
                    }
                    Action::Wait(*seconds)
                }
            };
            rules.push(Rule { condition, action });
        }

        let mut prepull = Vec::with_capacity(config.prepull.len());
        for action in &config.prepull {
            let spell = names
                .spell(&action.spell)
                .ok_or_else(|| ConfigError::unknown("spell", &action.spell, "prepull"))?;
            prepull.push(Prepull {
                spell,
                lead: action.lead,
            });
        }
        prepull.sort_by(|a, b| b.lead.cmp(&a.lead));

        Ok(Rotation { rules, prepull })
    }
}
