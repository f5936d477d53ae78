//! Compiled, type-checked value nodes and their evaluation

use super::config::{CompareOp, MathOp, ValueConfig};
use super::state::SimState;
use super::NameResolver;
use crate::config::ConfigError;
use crate::stat_block::DerivedStat;
use crate::types::{AuraId, ResourceKind, SpellId, Unit};
use std::fmt;
use std::time::Duration;

/// Static type of a value node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Number,
    Duration,
    String,
}

impl ValueType {
    fn is_numeric(self) -> bool {
        matches!(self, ValueType::Number | ValueType::Duration)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::Duration => "duration",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A compiled value node. Immutable and shared by every trial.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Duration(Duration),
    String(String),
    CurrentTime,
    RemainingTime,
    CurrentResource(ResourceKind),
    ResourcePercent(ResourceKind),
    CooldownRemaining(SpellId),
    IsReady(SpellId),
    GcdRemaining,
    IsCasting,
    RemainingCastTime,
    AuraActive(Unit, AuraId),
    AuraStacks(Unit, AuraId),
    AuraRemaining(Unit, AuraId),
    TargetHealthPercent,
    Stat(DerivedStat),
    Not(Box<Value>),
    And(Vec<Value>),
    Or(Vec<Value>),
    Compare(CompareOp, Box<Value>, Box<Value>),
    Math(MathOp, Box<Value>, Box<Value>, ValueType),
    Min(Vec<Value>, ValueType),
    Max(Vec<Value>, ValueType),
}

/// Convert seconds to a Duration, clamping negatives and NaN to zero
pub(crate) fn secs_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

fn type_error(message: String) -> ConfigError {
    ConfigError::TypeError(message)
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_)
            | Value::IsReady(_)
            | Value::IsCasting
            | Value::AuraActive(..)
            | Value::Not(_)
            | Value::And(_)
            | Value::Or(_)
            | Value::Compare(..) => ValueType::Bool,
            Value::Number(_)
            | Value::CurrentResource(_)
            | Value::ResourcePercent(_)
            | Value::AuraStacks(..)
            | Value::TargetHealthPercent
            | Value::Stat(_) => ValueType::Number,
            Value::Duration(_)
            | Value::CurrentTime
            | Value::RemainingTime
            | Value::CooldownRemaining(_)
            | Value::GcdRemaining
            | Value::RemainingCastTime
            | Value::AuraRemaining(..) => ValueType::Duration,
            Value::String(_) => ValueType::String,
            Value::Math(_, _, _, ty) | Value::Min(_, ty) | Value::Max(_, ty) => *ty,
        }
    }

    /// Compile a configured node, resolving names and checking types
    pub fn compile(config: &ValueConfig, names: &dyn NameResolver) -> Result<Value, ConfigError> {
        let spell = |name: &str| {
            names
                .spell(name)
                .ok_or_else(|| ConfigError::unknown("spell", name, "rotation value"))
        };
        let aura = |name: &str| {
            names
                .aura(name)
                .ok_or_else(|| ConfigError::unknown("aura", name, "rotation value"))
        };
        let resource = |kind: ResourceKind| {
            if names.has_resource(kind) {
                Ok(kind)
            } else {
                Err(ConfigError::unknown("resource", &kind.to_string(), "rotation value"))
            }
        };

        let value = match config {
            ValueConfig::Bool { value } => Value::Bool(*value),
            ValueConfig::Number { value } => Value::Number(*value),
            ValueConfig::Duration { seconds } => Value::Duration(*seconds),
            ValueConfig::String { value } => Value::String(value.clone()),
            ValueConfig::CurrentTime => Value::CurrentTime,
            ValueConfig::RemainingTime => Value::RemainingTime,
            ValueConfig::CurrentResource { resource: kind } => Value::CurrentResource(resource(*kind)?),
            ValueConfig::ResourcePercent { resource: kind } => Value::ResourcePercent(resource(*kind)?),
            ValueConfig::CooldownRemaining { spell: name } => Value::CooldownRemaining(spell(name)?),
            ValueConfig::IsReady { spell: name } => Value::IsReady(spell(name)?),
            ValueConfig::GcdRemaining => Value::GcdRemaining,
            ValueConfig::IsCasting => Value::IsCasting,
            ValueConfig::RemainingCastTime => Value::RemainingCastTime,
            ValueConfig::AuraActive { aura: name, on } => Value::AuraActive(*on, aura(name)?),
            ValueConfig::AuraStacks { aura: name, on } => Value::AuraStacks(*on, aura(name)?),
            ValueConfig::AuraRemaining { aura: name, on } => Value::AuraRemaining(*on, aura(name)?),
            ValueConfig::TargetHealthPercent => Value::TargetHealthPercent,
            ValueConfig::Stat { stat } => Value::Stat(*stat),
            ValueConfig::Not { value } => {
                let inner = Self::compile_bool(value, names, "not")?;
                Value::Not(Box::new(inner))
            }
            ValueConfig::And { values } => Value::And(Self::compile_bools(values, names, "and")?),
            ValueConfig::Or { values } => Value::Or(Self::compile_bools(values, names, "or")?),
            ValueConfig::Compare { op, lhs, rhs } => {
                let lhs = Self::compile(lhs, names)?;
                let rhs = Self::compile(rhs, names)?;
                let (lt, rt) = (lhs.value_type(), rhs.value_type());
                let comparable = (lt.is_numeric() && rt.is_numeric())
                    || (lt == rt && op.is_equality());
                if !comparable {
                    return Err(type_error(format!("cannot compare {} {:?} {}", lt, op, rt)));
                }
                Value::Compare(*op, Box::new(lhs), Box::new(rhs))
            }
            ValueConfig::Math { op, lhs, rhs } => {
                let lhs = Self::compile(lhs, names)?;
                let rhs = Self::compile(rhs, names)?;
                let ty = math_type(*op, lhs.value_type(), rhs.value_type())?;
                Value::Math(*op, Box::new(lhs), Box::new(rhs), ty)
            }
            ValueConfig::Min { values } => {
                let (values, ty) = Self::compile_numeric_list(values, names, "min")?;
                Value::Min(values, ty)
            }
            ValueConfig::Max { values } => {
                let (values, ty) = Self::compile_numeric_list(values, names, "max")?;
                Value::Max(values, ty)
            }
        };
        Ok(value)
    }

    /// Compile a node that must be boolean
    pub fn compile_bool(
        config: &ValueConfig,
        names: &dyn NameResolver,
        context: &str,
    ) -> Result<Value, ConfigError> {
        let value = Self::compile(config, names)?;
        if value.value_type() != ValueType::Bool {
            return Err(type_error(format!(
                "{} expects bool, found {}",
                context,
                value.value_type()
            )));
        }
        Ok(value)
    }

    fn compile_bools(
        configs: &[ValueConfig],
        names: &dyn NameResolver,
        context: &str,
    ) -> Result<Vec<Value>, ConfigError> {
        if configs.is_empty() {
            return Err(type_error(format!("{} needs at least one operand", context)));
        }
        configs
            .iter()
            .map(|c| Self::compile_bool(c, names, context))
            .collect()
    }

    fn compile_numeric_list(
        configs: &[ValueConfig],
        names: &dyn NameResolver,
        context: &str,
    ) -> Result<(Vec<Value>, ValueType), ConfigError> {
        let values: Vec<Value> = configs
            .iter()
            .map(|c| Self::compile(c, names))
            .collect::<Result<_, _>>()?;
        let Some(first) = values.first() else {
            return Err(type_error(format!("{} needs at least one operand", context)));
        };
        let ty = first.value_type();
        if !ty.is_numeric() || values.iter().any(|v| v.value_type() != ty) {
            return Err(type_error(format!(
                "{} operands must all be numbers or all durations",
                context
            )));
        }
        Ok((values, ty))
    }

    pub fn eval_bool(&self, state: &dyn SimState) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::IsReady(spell) => state.is_ready(*spell),
            Value::IsCasting => state.is_casting(),
            Value::AuraActive(unit, aura) => state.aura_active(*unit, *aura),
            Value::Not(inner) => !inner.eval_bool(state),
            Value::And(values) => values.iter().all(|v| v.eval_bool(state)),
            Value::Or(values) => values.iter().any(|v| v.eval_bool(state)),
            Value::Compare(op, lhs, rhs) => compare(*op, lhs, rhs, state),
            other => other.eval_number(state) != 0.0,
        }
    }

    /// Numeric value; durations read as seconds
    pub fn eval_number(&self, state: &dyn SimState) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::CurrentResource(kind) => state.resource(*kind),
            Value::ResourcePercent(kind) => state.resource_percent(*kind),
            Value::AuraStacks(unit, aura) => state.aura_stacks(*unit, *aura) as f64,
            Value::TargetHealthPercent => state.target_health_percent(),
            Value::Stat(stat) => state.stat(*stat),
            Value::Math(op, lhs, rhs, ValueType::Number) => seconds_math(*op, lhs, rhs, state),
            Value::Min(values, ValueType::Number) => values
                .iter()
                .map(|v| v.eval_number(state))
                .fold(f64::INFINITY, f64::min),
            Value::Max(values, ValueType::Number) => values
                .iter()
                .map(|v| v.eval_number(state))
                .fold(f64::NEG_INFINITY, f64::max),
            Value::String(_) => 0.0,
            other if other.value_type() == ValueType::Bool => {
                if other.eval_bool(state) {
                    1.0
                } else {
                    0.0
                }
            }
            _ => self.eval_duration(state).as_secs_f64(),
        }
    }

    pub fn eval_duration(&self, state: &dyn SimState) -> Duration {
        match self {
            Value::Duration(d) => *d,
            Value::CurrentTime => state.now(),
            Value::RemainingTime => state.remaining_time(),
            Value::CooldownRemaining(spell) => state.cooldown_remaining(*spell),
            Value::GcdRemaining => state.gcd_remaining(),
            Value::RemainingCastTime => state.remaining_cast_time(),
            Value::AuraRemaining(unit, aura) => state.aura_remaining(*unit, *aura),
            Value::Math(op, lhs, rhs, ValueType::Duration) => {
                match (op, lhs.value_type(), rhs.value_type()) {
                    (MathOp::Add, ValueType::Duration, ValueType::Duration) => lhs
                        .eval_duration(state)
                        .saturating_add(rhs.eval_duration(state)),
                    (MathOp::Sub, ValueType::Duration, ValueType::Duration) => lhs
                        .eval_duration(state)
                        .saturating_sub(rhs.eval_duration(state)),
                    _ => secs_to_duration(seconds_math(*op, lhs, rhs, state)),
                }
            }
            Value::Min(values, ValueType::Duration) => values
                .iter()
                .map(|v| v.eval_duration(state))
                .min()
                .unwrap_or(Duration::ZERO),
            Value::Max(values, ValueType::Duration) => values
                .iter()
                .map(|v| v.eval_duration(state))
                .max()
                .unwrap_or(Duration::ZERO),
            other => secs_to_duration(other.eval_number(state)),
        }
    }
}

/// Arithmetic on numeric operands, durations read as seconds
fn seconds_math(op: MathOp, lhs: &Value, rhs: &Value, state: &dyn SimState) -> f64 {
    let (a, b) = (lhs.eval_number(state), rhs.eval_number(state));
    match op {
        MathOp::Add => a + b,
        MathOp::Sub => a - b,
        MathOp::Mul => a * b,
        MathOp::Div if b == 0.0 => 0.0,
        MathOp::Div => a / b,
    }
}

fn math_type(op: MathOp, lhs: ValueType, rhs: ValueType) -> Result<ValueType, ConfigError> {
    use ValueType::{Duration as D, Number as N};
    let ty = match (op, lhs, rhs) {
        (_, N, N) => N,
        (MathOp::Add | MathOp::Sub, D, D) => D,
        (MathOp::Div, D, D) => N,
        (MathOp::Mul, D, N) | (MathOp::Mul, N, D) | (MathOp::Div, D, N) => D,
        _ => {
            return Err(type_error(format!(
                "unsupported arithmetic {} {:?} {}",
                lhs, op, rhs
            )))
        }
    };
    Ok(ty)
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value, state: &dyn SimState) -> bool {
    match (lhs.value_type(), rhs.value_type()) {
        (ValueType::Duration, ValueType::Duration) => {
            op.apply(lhs.eval_duration(state), rhs.eval_duration(state))
        }
        (ValueType::Bool, ValueType::Bool) => op.apply(lhs.eval_bool(state), rhs.eval_bool(state)),
        (ValueType::String, ValueType::String) => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => op.apply(a.as_str(), b.as_str()),
            _ => false,
        },
        _ => op.apply(lhs.eval_number(state), rhs.eval_number(state)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Name table and state stub for condition tests
    #[derive(Default)]
    pub(crate) struct MockState {
        pub now: Duration,
        pub remaining: Duration,
        pub embers: f64,
        pub cooldowns: HashMap<SpellId, Duration>,
        pub casting: Option<Duration>,
        pub auras: HashMap<AuraId, (u32, Duration)>,
        pub target_health: f64,
        pub stats: crate::stat_block::DerivedStats,
    }

    impl NameResolver for MockState {
        fn spell(&self, name: &str) -> Option<SpellId> {
            match name {
                "incinerate" => Some(SpellId(0)),
                "conflagrate" => Some(SpellId(1)),
                _ => None,
            }
        }

        fn aura(&self, name: &str) -> Option<AuraId> {
            (name == "immolate").then_some(AuraId(0))
        }

        fn has_resource(&self, kind: ResourceKind) -> bool {
            kind == ResourceKind::BurningEmbers
        }
    }

    impl SimState for MockState {
        fn now(&self) -> Duration {
            self.now
        }
        fn remaining_time(&self) -> Duration {
            self.remaining
        }
        fn resource(&self, _kind: ResourceKind) -> f64 {
            self.embers
        }
        fn resource_percent(&self, _kind: ResourceKind) -> f64 {
            self.embers / 40.0 * 100.0
        }
        fn cooldown_remaining(&self, spell: SpellId) -> Duration {
            self.cooldowns.get(&spell).copied().unwrap_or_default()
        }
        fn is_ready(&self, spell: SpellId) -> bool {
            self.cooldown_remaining(spell).is_zero()
        }
        fn gcd_remaining(&self) -> Duration {
            Duration::ZERO
        }
        fn is_casting(&self) -> bool {
            self.casting.is_some()
        }
        fn remaining_cast_time(&self) -> Duration {
            self.casting.unwrap_or_default()
        }
        fn aura_active(&self, _unit: Unit, aura: AuraId) -> bool {
            self.auras.contains_key(&aura)
        }
        fn aura_stacks(&self, _unit: Unit, aura: AuraId) -> u32 {
            self.auras.get(&aura).map(|a| a.0).unwrap_or(0)
        }
        fn aura_remaining(&self, _unit: Unit, aura: AuraId) -> Duration {
            self.auras.get(&aura).map(|a| a.1).unwrap_or_default()
        }
        fn target_health_percent(&self) -> f64 {
            self.target_health
        }
        fn stat(&self, stat: DerivedStat) -> f64 {
            self.stats.get(stat)
        }
    }

    fn parse(json: &str) -> ValueConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_compare_resource() {
        let state = MockState {
            embers: 12.0,
            ..Default::default()
        };
        let config = parse(
            r#"{"type": "compare", "op": "ge",
                "lhs": {"type": "current_resource", "resource": "burning_embers"},
                "rhs": {"type": "number", "value": 10}}"#,
        );
        let value = Value::compile_bool(&config, &state, "rule").unwrap();
        assert!(value.eval_bool(&state));
    }

    #[test]
    fn test_derived_stat_value() {
        let mut state = MockState::default();
        state.stats.mastery = 12.0;
        let config = parse(
            r#"{"type": "compare", "op": "gt",
                "lhs": {"type": "stat", "stat": "mastery"},
                "rhs": {"type": "number", "value": 10}}"#,
        );
        let value = Value::compile_bool(&config, &state, "rule").unwrap();
        assert!(value.eval_bool(&state));

        state.stats.mastery = 8.0;
        assert!(!value.eval_bool(&state));
    }

    #[test]
    fn test_duration_comparison_in_clock_units() {
        let mut state = MockState::default();
        state.auras.insert(AuraId(0), (1, Duration::from_millis(4499)));
        let config = parse(
            r#"{"type": "compare", "op": "lt",
                "lhs": {"type": "aura_remaining", "aura": "immolate", "on": "target"},
                "rhs": {"type": "duration", "seconds": 4.5}}"#,
        );
        let value = Value::compile(&config, &state).unwrap();
        assert!(value.eval_bool(&state));

        state.auras.insert(AuraId(0), (1, Duration::from_millis(4500)));
        assert!(!value.eval_bool(&state));
    }

    #[test]
    fn test_logic_and_math() {
        let mut state = MockState {
            now: Duration::from_secs(10),
            remaining: Duration::from_secs(50),
            ..Default::default()
        };
        state.cooldowns.insert(SpellId(1), Duration::from_secs(3));
        let config = parse(
            r#"{"type": "and", "values": [
                {"type": "not", "value": {"type": "is_ready", "spell": "conflagrate"}},
                {"type": "compare", "op": "gt",
                 "lhs": {"type": "math", "op": "add",
                         "lhs": {"type": "current_time"},
                         "rhs": {"type": "cooldown_remaining", "spell": "conflagrate"}},
                 "rhs": {"type": "duration", "seconds": 12.5}}
            ]}"#,
        );
        let value = Value::compile_bool(&config, &state, "rule").unwrap();
        assert!(value.eval_bool(&state));

        let min = parse(
            r#"{"type": "min", "values": [{"type": "remaining_time"}, {"type": "current_time"}]}"#,
        );
        let min = Value::compile(&min, &state).unwrap();
        assert_eq!(min.value_type(), ValueType::Duration);
        assert_eq!(min.eval_duration(&state), Duration::from_secs(10));

        let ratio = parse(
            r#"{"type": "math", "op": "div", "lhs": {"type": "current_time"}, "rhs": {"type": "remaining_time"}}"#,
        );
        let ratio = Value::compile(&ratio, &state).unwrap();
        assert_eq!(ratio.value_type(), ValueType::Number);
        assert!((ratio.eval_number(&state) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_type_errors() {
        let state = MockState::default();
        let bad_compare = parse(
            r#"{"type": "compare", "op": "lt", "lhs": {"type": "is_casting"}, "rhs": {"type": "number", "value": 1}}"#,
        );
        assert!(matches!(
            Value::compile(&bad_compare, &state),
            Err(ConfigError::TypeError(_))
        ));

        let bad_and = parse(r#"{"type": "and", "values": [{"type": "current_time"}]}"#);
        assert!(matches!(
            Value::compile(&bad_and, &state),
            Err(ConfigError::TypeError(_))
        ));

        let bad_math = parse(
            r#"{"type": "math", "op": "mul", "lhs": {"type": "current_time"}, "rhs": {"type": "remaining_time"}}"#,
        );
        assert!(matches!(
            Value::compile(&bad_math, &state),
            Err(ConfigError::TypeError(_))
        ));

        let not_bool = parse(r#"{"type": "number", "value": 1}"#);
        assert!(Value::compile_bool(&not_bool, &state, "rule").is_err());
    }

    #[test]
    fn test_unknown_references() {
        let state = MockState::default();
        let unknown_spell = parse(r#"{"type": "is_ready", "spell": "shadowburn"}"#);
        assert!(matches!(
            Value::compile(&unknown_spell, &state),
            Err(ConfigError::UnknownReference { kind: "spell", .. })
        ));

        let unknown_resource = parse(r#"{"type": "current_resource", "resource": "rage"}"#);
        assert!(matches!(
            Value::compile(&unknown_resource, &state),
            Err(ConfigError::UnknownReference { kind: "resource", .. })
        ));
    }

    #[test]
    fn test_remaining_cast_time() {
        let state = MockState {
            casting: Some(Duration::from_millis(1200)),
            ..Default::default()
        };
        let config = parse(
            r#"{"type": "compare", "op": "le", "lhs": {"type": "remaining_cast_time"}, "rhs": {"type": "gcd_remaining"}}"#,
        );
        let value = Value::compile(&config, &state).unwrap();
        assert!(!value.eval_bool(&state));
    }
}
