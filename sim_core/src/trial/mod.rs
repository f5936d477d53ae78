//! Trial runner - one seeded, single-threaded simulation of an encounter
//!
//! A trial owns fresh actor state, its own random stream, scheduler and proc
//! bus. It reads the shared [`Registry`] by reference and never mutates it.

mod auras;
mod decision;
mod executor;
mod procs;

use crate::actor::Actor;
use crate::bus::{EventKind, ProcBus};
use crate::error::SimError;
use crate::metrics::{LogEntry, TrialMetrics};
use crate::random::RandomStream;
use crate::registry::Registry;
use crate::scheduler::{EventHandle, Scheduler};
use crate::spell::SpellResult;
use crate::types::{ActorId, AuraId, SpellId};
use std::time::Duration;
use tracing::{debug, trace};

/// Payload of a scheduled event
#[derive(Debug, Clone)]
pub(crate) enum SimEvent {
    /// Evaluate the rotation
    Decision,
    CastComplete {
        caster: ActorId,
        spell: SpellId,
        target: ActorId,
    },
    /// A resolved spell reaches its target after travel time. `base` is the
    /// rolled amount before power scaling.
    Land { result: SpellResult, base: f64 },
    AuraExpire { actor: ActorId, aura: AuraId },
    AuraTick { actor: ActorId, aura: AuraId },
    IncomingDamage,
    /// Casts made before the pull, resolved at time zero
    Prepull,
    EncounterEnd,
}

/// Metrics and optional log of a finished trial
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub metrics: TrialMetrics,
    pub log: Option<Vec<LogEntry>>,
}

pub struct Trial<'a> {
    registry: &'a Registry,
    rng: RandomStream,
    scheduler: Scheduler<SimEvent>,
    /// Player at index 0, targets after it
    actors: Vec<Actor>,
    bus: ProcBus<usize>,
    metrics: TrialMetrics,
    log: Option<Vec<LogEntry>>,
    end: Duration,
    started: bool,
    finished: bool,
    decision: Option<PendingDecision>,
    /// Decisions made at the current instant, for the runaway guard
    decisions_at: (Duration, u32),
}

#[derive(Debug, Clone, Copy)]
struct PendingDecision {
    handle: EventHandle,
    at: Duration,
    /// Set by a rotation wait, which other events must not cut short
    waiting: bool,
}

impl<'a> Trial<'a> {
    /// Set up fresh state for one trial. The encounter length is drawn from
    /// the trial's own stream when the encounter varies in duration.
    pub fn new(registry: &'a Registry, seed: u64) -> Self {
        let mut rng = RandomStream::from_seed(seed);
        let encounter = &registry.encounter;
        let variation = encounter.duration_variation.as_secs_f64();
        let nominal = encounter.duration.as_secs_f64();
        let length = if variation > 0.0 {
            crate::apl::secs_to_duration(rng.range(nominal - variation, nominal + variation))
        } else {
            encounter.duration
        };
        let end = length.min(registry.constants.engine.max_sim_time);

        let mut actors = vec![Actor::player(registry)];
        for index in 1..=encounter.target_count {
            actors.push(Actor::target(registry, index));
        }

        let mut bus = ProcBus::new();
        for (index, proc) in registry.procs.iter().enumerate() {
            bus.subscribe(proc.trigger.clone(), proc.chance, proc.icd, index);
        }

        Trial {
            registry,
            rng,
            scheduler: Scheduler::new(),
            actors,
            bus,
            metrics: TrialMetrics::new(seed),
            log: None,
            end,
            started: false,
            finished: false,
            decision: None,
            decisions_at: (Duration::ZERO, 0),
        }
    }

    /// Record a combat log for this trial
    pub fn with_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Length of this trial's encounter
    pub fn end(&self) -> Duration {
        self.end
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.index())
    }

    pub fn player(&self) -> &Actor {
        &self.actors[0]
    }

    pub fn metrics(&self) -> &TrialMetrics {
        &self.metrics
    }

    /// Number of events of `kind` published on the proc bus so far
    pub fn published(&self, kind: EventKind) -> u64 {
        self.bus.published(kind)
    }

    /// Schedule the encounter end, incoming damage and the first decision
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        // Scheduled first so it wins ties with anything else due at `end`
        self.scheduler.schedule_at(self.end, SimEvent::EncounterEnd);
        if let Some(incoming) = &self.registry.encounter.incoming_damage {
            let first = incoming.first_at.unwrap_or(incoming.interval);
            self.scheduler.schedule_at(first, SimEvent::IncomingDamage);
        }
        if !self.registry.rotation.prepull.is_empty() {
            self.scheduler.schedule_at(Duration::ZERO, SimEvent::Prepull);
        }
        self.schedule_decision(Duration::ZERO, false);
    }

    /// Process every event due at or before `until`
    pub fn advance_to(&mut self, until: Duration) -> Result<(), SimError> {
        let until = until.min(self.end);
        while !self.finished {
            let next = self
                .scheduler
                .pop_until(until)
                .map_err(|e| self.invariant(ActorId::PLAYER, "dispatch", e.to_string()))?;
            let Some((_, event)) = next else {
                break;
            };
            self.metrics.events += 1;
            self.dispatch(event)?;
        }
        Ok(())
    }

    /// Run the encounter to completion
    pub fn run(mut self) -> Result<TrialOutcome, SimError> {
        self.start();
        self.advance_to(self.end)?;

        self.metrics.duration = self.metrics.target_killed_at.unwrap_or(self.end);
        debug!(
            seed = self.rng.seed(),
            duration = ?self.metrics.duration,
            dps = self.metrics.dps(),
            casts = self.metrics.casts,
            events = self.metrics.events,
            "trial finished"
        );
        Ok(TrialOutcome {
            metrics: self.metrics,
            log: self.log,
        })
    }

    fn dispatch(&mut self, event: SimEvent) -> Result<(), SimError> {
        trace!(now = ?self.now(), ?event, "event");
        match event {
            SimEvent::Decision => {
                self.decision = None;
                return self.decide();
            }
            SimEvent::CastComplete {
                caster,
                spell,
                target,
            } => {
                if let Some(actor) = self.actors.get_mut(caster.index()) {
                    actor.hardcast = None;
                }
                self.complete_cast(caster, spell, target)?;
            }
            SimEvent::Land { result, base } => self.land_delayed(result, base)?,
            SimEvent::AuraExpire { actor, aura } => self.expire_aura(actor, aura)?,
            SimEvent::AuraTick { actor, aura } => self.tick_aura(actor, aura)?,
            SimEvent::IncomingDamage => self.incoming_damage()?,
            SimEvent::Prepull => self.prepull()?,
            SimEvent::EncounterEnd => {
                self.finished = true;
                return Ok(());
            }
        }
        self.wake_if_idle();
        Ok(())
    }

    /// Index of the first living target, falling back to the first target
    pub(crate) fn primary_target(&self) -> ActorId {
        self.actors
            .iter()
            .skip(1)
            .find(|a| a.is_alive())
            .map(|a| a.id)
            .unwrap_or(ActorId(1))
    }

    pub(crate) fn living_targets(&self) -> Vec<ActorId> {
        self.actors
            .iter()
            .skip(1)
            .filter(|a| a.is_alive())
            .map(|a| a.id)
            .collect()
    }

    pub(crate) fn actor_name(&self, id: ActorId) -> &str {
        self.actors
            .get(id.index())
            .map(|a| a.name.as_str())
            .unwrap_or("?")
    }

    pub(crate) fn invariant(&self, actor: ActorId, action: &str, detail: impl Into<String>) -> SimError {
        SimError::Invariant {
            seed: self.rng.seed(),
            time: self.now(),
            actor: self.actor_name(actor).to_string(),
            action: action.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn actor_mut(&mut self, id: ActorId, action: &str) -> Result<&mut Actor, SimError> {
        if id.index() >= self.actors.len() {
            return Err(self.invariant(ActorId::PLAYER, action, format!("no actor {}", id.0)));
        }
        Ok(&mut self.actors[id.index()])
    }

    /// Append to the combat log; the message is only built when logging
    pub(crate) fn log(&mut self, actor: ActorId, message: impl FnOnce() -> String) {
        if self.log.is_none() {
            return;
        }
        let entry = LogEntry {
            time: self.now(),
            actor: self.actor_name(actor).to_string(),
            message: message(),
        };
        if let Some(log) = self.log.as_mut() {
            log.push(entry);
        }
    }

    /// Apply damage to a unit, recording deaths. Returns the damage dealt,
    /// which is zero for a unit that is already dead.
    pub(crate) fn deal_damage(&mut self, target: ActorId, amount: f64) -> Result<f64, SimError> {
        let now = self.now();
        let actor = self.actor_mut(target, "damage")?;
        if !actor.is_alive() || amount <= 0.0 {
            return Ok(0.0);
        }
        actor.health -= amount;
        if actor.mortal && actor.health <= 0.0 {
            actor.health = 0.0;
            actor.died_at = Some(now);
            self.on_death(target);
        }
        Ok(amount)
    }

    /// Heal a unit; returns (effective, overheal)
    pub(crate) fn heal(&mut self, target: ActorId, amount: f64) -> Result<(f64, f64), SimError> {
        let actor = self.actor_mut(target, "heal")?;
        if amount <= 0.0 {
            return Ok((0.0, 0.0));
        }
        let missing = (actor.max_health - actor.health).max(0.0);
        let effective = amount.min(missing);
        actor.health += effective;
        Ok((effective, amount - effective))
    }

    fn on_death(&mut self, target: ActorId) {
        self.log(target, || "dies".to_string());
        self.clear_auras(target);
        if target != ActorId::PLAYER && self.living_targets().is_empty() {
            self.metrics.target_killed_at = Some(self.now());
            self.finished = true;
            debug!(at = ?self.now(), "all targets dead");
        }
    }

    fn incoming_damage(&mut self) -> Result<(), SimError> {
        let registry = self.registry;
        let Some(incoming) = &registry.encounter.incoming_damage else {
            return Ok(());
        };
        let school = incoming.school;
        let player = &self.actors[0];
        let mut amount = incoming.amount * player.damage_taken_multiplier(registry, school);
        if school.is_physical() {
            amount = crate::defense::apply_armor(
                amount,
                player.derived.armor,
                registry.constants.combat.armor_constant,
            );
        }

        self.metrics.damage_taken += amount;
        let player = &mut self.actors[0];
        player.health = (player.health - amount).max(0.0);
        self.log(ActorId::PLAYER, || format!("takes {:.0} {:?} damage", amount, school));
        self.scheduler.schedule(incoming.interval, SimEvent::IncomingDamage);
        Ok(())
    }
}

/// Run one trial of `registry` with the given seed
pub fn run_trial(registry: &Registry, seed: u64, keep_log: bool) -> Result<TrialOutcome, SimError> {
    let trial = Trial::new(registry, seed);
    let trial = if keep_log { trial.with_log() } else { trial };
    trial.run()
}
