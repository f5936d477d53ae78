//! Combat events and proc trigger definitions

use crate::config::secs;
use crate::types::{ActorId, AuraId, OutcomeKind, ResourceKind, SpellId, SpellSchool, Unit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed set of events published on the proc bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CastStarted,
    CastCompleted,
    SpellResolved,
    PeriodicTick,
    AuraGained,
    AuraStacked,
    AuraExpired,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::CastStarted,
        EventKind::CastCompleted,
        EventKind::SpellResolved,
        EventKind::PeriodicTick,
        EventKind::AuraGained,
        EventKind::AuraStacked,
        EventKind::AuraExpired,
    ];

    pub(crate) fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A published combat event
#[derive(Debug, Clone, PartialEq)]
pub struct CombatEvent {
    pub kind: EventKind,
    pub time: Duration,
    pub source: ActorId,
    pub target: ActorId,
    pub spell: Option<SpellId>,
    pub aura: Option<AuraId>,
    pub school: Option<SpellSchool>,
    pub outcome: Option<OutcomeKind>,
    pub amount: f64,
}

impl CombatEvent {
    pub fn new(kind: EventKind, time: Duration, source: ActorId, target: ActorId) -> Self {
        CombatEvent {
            kind,
            time,
            source,
            target,
            spell: None,
            aura: None,
            school: None,
            outcome: None,
            amount: 0.0,
        }
    }

    pub fn with_spell(mut self, spell: SpellId, school: SpellSchool) -> Self {
        self.spell = Some(spell);
        self.school = Some(school);
        self
    }

    pub fn with_aura(mut self, aura: AuraId) -> Self {
        self.aura = Some(aura);
        self
    }

    pub fn with_outcome(mut self, outcome: OutcomeKind, amount: f64) -> Self {
        self.outcome = Some(outcome);
        self.amount = amount;
        self
    }
}

/// Which resolution outcomes a trigger reacts to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeFilter {
    #[default]
    Any,
    Landed,
    Crit,
}

impl OutcomeFilter {
    pub fn accepts(self, outcome: Option<OutcomeKind>) -> bool {
        match self {
            OutcomeFilter::Any => true,
            OutcomeFilter::Landed => outcome.is_some_and(|o| o.landed()),
            OutcomeFilter::Crit => outcome.is_some_and(|o| o.is_crit()),
        }
    }
}

/// What a proc does when it fires, as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcEffectConfig {
    ApplyAura {
        aura: String,
        #[serde(default)]
        on: Unit,
    },
    /// Cast a spell for free, off the global cooldown
    CastSpell { spell: String },
    GainResource { resource: ResourceKind, amount: f64 },
    /// Roll a fraction of the triggering amount into a periodic aura on the target
    Ignite { aura: String, fraction: f64 },
}

/// A proc trigger as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcConfig {
    pub id: String,
    pub on: EventKind,
    /// Restrict to these spells; empty matches any
    #[serde(default)]
    pub spells: Vec<String>,
    #[serde(default)]
    pub school: Option<SpellSchool>,
    /// Restrict aura events to this aura
    #[serde(default)]
    pub aura: Option<String>,
    #[serde(default)]
    pub outcome: OutcomeFilter,
    /// Probability in 0.0..=1.0
    #[serde(default = "default_chance")]
    pub chance: f64,
    /// Internal cooldown between activations
    #[serde(default, with = "secs")]
    pub icd: Duration,
    pub effect: ProcEffectConfig,
}

fn default_chance() -> f64 {
    1.0
}

/// Resolved effect of a proc
#[derive(Debug, Clone, PartialEq)]
pub enum ProcEffect {
    ApplyAura { aura: AuraId, on: Unit },
    CastSpell { spell: SpellId },
    GainResource { resource: ResourceKind, amount: f64 },
    Ignite { aura: AuraId, fraction: f64 },
}

/// Event predicate of a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub kind: EventKind,
    pub spells: Vec<SpellId>,
    pub school: Option<SpellSchool>,
    pub aura: Option<AuraId>,
    pub outcome: OutcomeFilter,
    /// Only events caused by this actor
    pub source: ActorId,
}

impl Trigger {
    pub fn on(kind: EventKind) -> Self {
        Trigger {
            kind,
            spells: Vec::new(),
            school: None,
            aura: None,
            outcome: OutcomeFilter::Any,
            source: ActorId::PLAYER,
        }
    }

    pub fn matches(&self, event: &CombatEvent) -> bool {
        if event.kind != self.kind || event.source != self.source {
            return false;
        }
        if !self.spells.is_empty() && !event.spell.is_some_and(|s| self.spells.contains(&s)) {
            return false;
        }
        if let Some(school) = self.school {
            if event.school != Some(school) {
                return false;
            }
        }
        if let Some(aura) = self.aura {
            if event.aura != Some(aura) {
                return false;
            }
        }
        self.outcome.accepts(event.outcome)
    }
}

/// Validated proc template
#[derive(Debug, Clone)]
pub struct Proc {
    pub name: String,
    pub trigger: Trigger,
    pub chance: f64,
    pub icd: Duration,
    pub effect: ProcEffect,
}
