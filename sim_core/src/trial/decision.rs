//! Rotation decisions and the state view conditions read

use super::{PendingDecision, SimEvent, Trial};
use crate::actor::Actor;
use crate::apl::{Action, SimState};
use crate::error::SimError;
use crate::spell::Attempt;
use crate::stat_block::DerivedStat;
use crate::types::{ActorId, AuraId, ResourceKind, SpellId, Unit};
use std::time::Duration;
use tracing::warn;

/// Decisions allowed at one instant before the rotation is declared stuck
const MAX_DECISIONS_PER_INSTANT: u32 = 1000;

impl<'a> Trial<'a> {
    /// Replace the pending decision with one at `at`
    pub(crate) fn schedule_decision(&mut self, at: Duration, waiting: bool) {
        if let Some(pending) = self.decision.take() {
            self.scheduler.cancel(pending.handle);
        }
        let at = at.max(self.now());
        let handle = self.scheduler.schedule_at(at, SimEvent::Decision);
        self.decision = Some(PendingDecision { handle, at, waiting });
    }

    /// Re-run the rotation now when the player is idle and only polling
    pub(crate) fn wake_if_idle(&mut self) {
        if self.finished {
            return;
        }
        let now = self.now();
        if self
            .decision
            .is_some_and(|pending| pending.waiting || pending.at <= now)
        {
            return;
        }
        let player = self.player();
        if player.is_alive() && player.idle_at() <= now {
            self.schedule_decision(now, false);
        }
    }

    /// Walk the rotation top to bottom and act on the first rule that can
    pub(crate) fn decide(&mut self) -> Result<(), SimError> {
        if self.finished {
            return Ok(());
        }
        let now = self.now();
        let idle_at = self.player().idle_at();
        if idle_at > now {
            self.schedule_decision(idle_at, false);
            return Ok(());
        }

        let (at, count) = self.decisions_at;
        let count = if at == now { count + 1 } else { 1 };
        self.decisions_at = (now, count);
        if count > MAX_DECISIONS_PER_INSTANT {
            warn!(seed = self.rng.seed(), at = ?now, "rotation stuck");
            return Err(self.invariant(
                ActorId::PLAYER,
                "decide",
                format!("{} decisions without time advancing", count),
            ));
        }

        let registry = self.registry;
        let target = self.primary_target();
        for rule in &registry.rotation.rules {
            if !rule.applies(&TrialView::new(self)) {
                continue;
            }
            match rule.action {
                Action::Wait(duration) => {
                    self.log(ActorId::PLAYER, || format!("waits {:?}", duration));
                    self.schedule_decision(now.saturating_add(duration), true);
                    return Ok(());
                }
                Action::Cast(spell) => {
                    if self.attempt(ActorId::PLAYER, spell, target)?.is_rejected() {
                        continue;
                    }
                    if !self.finished {
                        let next = self.player().idle_at();
                        self.schedule_decision(next, false);
                    }
                    return Ok(());
                }
            }
        }

        let next = self.next_opportunity(now);
        self.schedule_decision(next, false);
        Ok(())
    }

    /// Earliest time something in the rotation could change: the poll
    /// interval, the GCD, a cooldown or a cost becoming affordable
    fn next_opportunity(&self, now: Duration) -> Duration {
        let registry = self.registry;
        let player = self.player();
        let mut next = now.saturating_add(registry.constants.engine.poll_interval);
        let mut consider = |at: Duration| {
            if at > now && at < next {
                next = at;
            }
        };

        consider(player.gcd_ready);
        for rule in &registry.rotation.rules {
            let Action::Cast(spell) = rule.action else {
                continue;
            };
            consider(player.cooldown_ready(spell));
            let cost = registry.spell(spell).and_then(|s| s.cost);
            if let Some(cost) = cost {
                if let Some(at) = player
                    .resource(cost.resource)
                    .and_then(|pool| pool.ready_at(now, cost.amount))
                {
                    consider(at);
                }
            }
        }
        next
    }
}

/// Read-only view of a trial for rotation and spell conditions
pub(crate) struct TrialView<'t, 'a> {
    trial: &'t Trial<'a>,
}

impl<'t, 'a> TrialView<'t, 'a> {
    pub(crate) fn new(trial: &'t Trial<'a>) -> Self {
        TrialView { trial }
    }

    fn player(&self) -> &Actor {
        self.trial.player()
    }

    fn unit(&self, unit: Unit) -> Option<&Actor> {
        match unit {
            Unit::Player => Some(self.player()),
            Unit::Target => self.trial.actor(self.trial.primary_target()),
        }
    }
}

impl SimState for TrialView<'_, '_> {
    fn now(&self) -> Duration {
        self.trial.now()
    }

    fn remaining_time(&self) -> Duration {
        self.trial.end.saturating_sub(self.now())
    }

    fn resource(&self, kind: ResourceKind) -> f64 {
        self.player()
            .resource(kind)
            .map(|pool| pool.value_at(self.now()))
            .unwrap_or(0.0)
    }

    fn resource_percent(&self, kind: ResourceKind) -> f64 {
        self.player()
            .resource(kind)
            .map(|pool| pool.fraction_at(self.now()) * 100.0)
            .unwrap_or(0.0)
    }

    fn cooldown_remaining(&self, spell: SpellId) -> Duration {
        self.player().cooldown_remaining(spell, self.now())
    }

    fn is_ready(&self, spell: SpellId) -> bool {
        let now = self.now();
        let player = self.player();
        if !player.cooldown_remaining(spell, now).is_zero() {
            return false;
        }
        let cost = self.trial.registry.spell(spell).and_then(|s| s.cost);
        cost.map_or(true, |cost| {
            player
                .resource(cost.resource)
                .is_some_and(|pool| pool.can_spend(now, cost.amount))
        })
    }

    fn gcd_remaining(&self) -> Duration {
        self.player().gcd_remaining(self.now())
    }

    fn is_casting(&self) -> bool {
        self.player().is_casting(self.now())
    }

    fn remaining_cast_time(&self) -> Duration {
        self.player().remaining_cast_time(self.now())
    }

    fn aura_active(&self, unit: Unit, aura: AuraId) -> bool {
        self.unit(unit).is_some_and(|a| a.auras.contains(aura))
    }

    fn aura_stacks(&self, unit: Unit, aura: AuraId) -> u32 {
        self.unit(unit).map(|a| a.auras.stacks(aura)).unwrap_or(0)
    }

    fn aura_remaining(&self, unit: Unit, aura: AuraId) -> Duration {
        let now = self.now();
        self.unit(unit)
            .map(|a| a.auras.remaining(aura, now))
            .unwrap_or(Duration::ZERO)
    }

    fn target_health_percent(&self) -> f64 {
        self.unit(Unit::Target)
            .map(|a| a.health_percent())
            .unwrap_or(0.0)
    }

    fn stat(&self, stat: DerivedStat) -> f64 {
        self.player().derived.get(stat)
    }
}
