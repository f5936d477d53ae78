//! Aura application, periodic ticks, expiry and rolling effects

use super::{SimEvent, Trial};
use crate::aura::{ActiveAura, Application, ModifierPolicy};
use crate::bus::{CombatEvent, EventKind};
use crate::error::SimError;
use crate::spell::{final_amount, OutcomeTable};
use crate::types::{ActorId, AuraId, OutcomeKind};
use std::time::Duration;

impl<'a> Trial<'a> {
    /// Apply `aura` from `source` to `target`, arming its expiry and ticks
    pub fn apply_aura(&mut self, source: ActorId, target: ActorId, aura: AuraId) -> Result<Application, SimError> {
        let registry = self.registry;
        let template = registry
            .aura(aura)
            .ok_or_else(|| self.invariant(source, "apply aura", format!("unknown aura {}", aura.0)))?;
        let now = self.now();

        let snapshot = match &template.periodic {
            Some(periodic) if periodic.policy == ModifierPolicy::Snapshot => self
                .actor(source)
                .map(|a| a.snapshot(registry, periodic.school)),
            _ => None,
        };

        let index = self.actor_mut(target, "apply aura")?.id.index();
        if !self.actors[index].is_alive() {
            return Ok(Application::Unchanged);
        }
        let application = self.actors[index].auras.apply(template, source, now);
        if application == Application::Unchanged {
            return Ok(application);
        }

        let Some(active) = self.actors[index].auras.get_mut(aura) else {
            return Err(self.invariant(target, "apply aura", format!("{} missing after apply", template.name)));
        };
        let rearm = application == Application::Gained || application.refreshed();
        if rearm {
            if let Some(expires_at) = active.expires_at {
                if let Some(old) = active.expire_handle.take() {
                    self.scheduler.cancel(old);
                }
                active.expire_handle = Some(
                    self.scheduler
                        .schedule_at(expires_at, SimEvent::AuraExpire { actor: target, aura }),
                );
            }
        }
        if let Some(periodic) = &template.periodic {
            if rearm && snapshot.is_some() {
                active.snapshot = snapshot;
            }
            // A refresh keeps the running tick timer
            if active.tick_handle.is_none() && !periodic.interval.is_zero() {
                let at = now.saturating_add(periodic.interval);
                active.next_tick = Some(at);
                active.tick_handle = Some(
                    self.scheduler
                        .schedule_at(at, SimEvent::AuraTick { actor: target, aura }),
                );
            }
        }

        if template.touches_stats() {
            self.actors[index].refresh_stats(registry);
        }

        let stacks = self.actors[index].auras.stacks(aura);
        self.log(target, || format!("{} {:?} ({} stacks)", template.name, application, stacks));
        let kind = match application {
            Application::Gained => Some(EventKind::AuraGained),
            a if a.stacked() => Some(EventKind::AuraStacked),
            _ => None,
        };
        if let Some(kind) = kind {
            self.publish(CombatEvent::new(kind, now, source, target).with_aura(aura))?;
        }
        Ok(application)
    }

    /// Expiry event. A tick due at the same instant is dealt first.
    pub(crate) fn expire_aura(&mut self, actor: ActorId, aura: AuraId) -> Result<(), SimError> {
        let now = self.now();
        let index = self.actor_mut(actor, "expire aura")?.id.index();
        let Some(active) = self.actors[index].auras.get_mut(aura) else {
            return Ok(());
        };
        if active.expires_at.map_or(true, |at| at > now) {
            return Ok(());
        }
        active.expire_handle = None;
        if active.next_tick == Some(now) {
            if let Some(handle) = active.tick_handle.take() {
                self.scheduler.cancel(handle);
            }
            self.tick_aura(actor, aura)?;
        }

        let Some(removed) = self.detach_aura(actor, aura) else {
            return Ok(());
        };
        let name = self.registry.aura_name(aura);
        self.log(actor, || format!("{} fades", name));
        self.publish(CombatEvent::new(EventKind::AuraExpired, now, removed.source, actor).with_aura(aura))
    }

    /// Pull every instance of `aura` forward by `by`, as if applied that
    /// much earlier. An instance aged past now expires at now.
    pub(crate) fn age_aura(&mut self, aura: AuraId, by: Duration) {
        let now = self.now();
        for index in 0..self.actors.len() {
            let actor = self.actors[index].id;
            let Some(active) = self.actors[index].auras.get_mut(aura) else {
                continue;
            };
            let Some(expires_at) = active.expires_at else {
                continue;
            };
            let aged = expires_at.saturating_sub(by).max(now);
            active.expires_at = Some(aged);
            if let Some(old) = active.expire_handle.take() {
                self.scheduler.cancel(old);
            }
            active.expire_handle = Some(self.scheduler.schedule_at(aged, SimEvent::AuraExpire { actor, aura }));
        }
    }

    /// Remove an aura without publishing, cancelling its pending events
    fn detach_aura(&mut self, actor: ActorId, aura: AuraId) -> Option<ActiveAura> {
        let registry = self.registry;
        let owner = self.actors.get_mut(actor.index())?;
        let removed = owner.auras.remove(aura)?;
        if registry.aura(aura).is_some_and(|a| a.touches_stats()) {
            owner.refresh_stats(registry);
        }
        self.cancel_handles(&removed);
        Some(removed)
    }

    fn cancel_handles(&mut self, active: &ActiveAura) {
        for handle in [active.expire_handle, active.tick_handle].into_iter().flatten() {
            self.scheduler.cancel(handle);
        }
    }

    /// Drop every aura on a unit that died
    pub(crate) fn clear_auras(&mut self, actor: ActorId) {
        let registry = self.registry;
        let Some(owner) = self.actors.get_mut(actor.index()) else {
            return;
        };
        let removed = owner.auras.clear();
        owner.refresh_stats(registry);
        for active in &removed {
            self.cancel_handles(active);
        }
    }

    /// Periodic tick. The next tick is armed before damage is dealt so a
    /// death during this tick cancels it.
    pub(crate) fn tick_aura(&mut self, actor: ActorId, aura: AuraId) -> Result<(), SimError> {
        let registry = self.registry;
        let template = registry
            .aura(aura)
            .ok_or_else(|| self.invariant(actor, "tick", format!("unknown aura {}", aura.0)))?;
        let Some(periodic) = &template.periodic else {
            return Ok(());
        };
        let now = self.now();
        let index = self.actor_mut(actor, "tick")?.id.index();
        let Some(active) = self.actors[index].auras.get(aura) else {
            return Ok(());
        };
        let source = active.source;
        let stacks = active.stacks as f64;
        let stored = active.snapshot;
        let rolling = active
            .rolling_pool
            .map(|pool| (pool, active.ticks_left(now, periodic.interval).max(1)));
        let expires_at = active.expires_at;

        let (amount, outcome) = match rolling {
            Some((pool, ticks)) => (pool / ticks as f64, OutcomeKind::Hit),
            None => {
                let snapshot = match (periodic.policy, stored) {
                    (ModifierPolicy::Snapshot, Some(snapshot)) => snapshot,
                    _ => self
                        .actor(source)
                        .map(|a| a.snapshot(registry, periodic.school))
                        .unwrap_or_default(),
                };
                let raw = (periodic.base + periodic.coefficient * snapshot.scaling(periodic.scales_with)) * stacks;
                let crit_percent = if periodic.can_crit { snapshot.crit_percent } else { 0.0 };
                let table = OutcomeTable {
                    crit: (crit_percent / 100.0).max(0.0),
                    ..Default::default()
                };
                let crit_multiplier = registry.constants.combat.crit_multiplier;
                let mut inputs = self.inputs_for(periodic.school, actor, 0.0, crit_multiplier, periodic.heal);
                inputs.mastery_scaling = periodic.mastery_scaling;
                let outcome = table.roll(&mut self.rng);
                (final_amount(raw, outcome, &snapshot, &inputs), outcome)
            }
        };

        let next = now.saturating_add(periodic.interval);
        let Some(active) = self.actors[index].auras.get_mut(aura) else {
            return Ok(());
        };
        if let Some(pool) = active.rolling_pool.as_mut() {
            *pool = (*pool - amount).max(0.0);
        }
        if expires_at.map_or(true, |at| next <= at) {
            active.next_tick = Some(next);
            active.tick_handle = Some(self.scheduler.schedule_at(next, SimEvent::AuraTick { actor, aura }));
        } else {
            active.next_tick = None;
            active.tick_handle = None;
        }

        let dealt = if periodic.heal {
            let (effective, overheal) = self.heal(actor, amount)?;
            self.metrics.total_healing += effective;
            self.metrics.overhealing += overheal;
            self.metrics.spell_mut(&template.name).healing += effective;
            effective
        } else {
            let dealt = self.deal_damage(actor, amount)?;
            self.metrics.total_damage += dealt;
            self.metrics.spell_mut(&template.name).damage += dealt;
            dealt
        };
        let breakdown = self.metrics.spell_mut(&template.name);
        breakdown.ticks += 1;
        if outcome.is_crit() {
            breakdown.crits += 1;
        }
        self.log(actor, || format!("{} ticks for {:.0}", template.name, dealt));

        let mut event = CombatEvent::new(EventKind::PeriodicTick, now, source, actor)
            .with_aura(aura)
            .with_outcome(outcome, dealt);
        event.school = Some(periodic.school);
        self.publish(event)
    }

    /// Roll `amount` into the target's copy of `aura`. Undealt damage from
    /// a previous application carries over and the duration restarts.
    pub(crate) fn ignite(&mut self, source: ActorId, target: ActorId, aura: AuraId, amount: f64) -> Result<(), SimError> {
        let carried = self
            .actor(target)
            .and_then(|t| t.auras.get(aura))
            .and_then(|a| a.rolling_pool)
            .unwrap_or(0.0);
        self.detach_aura(target, aura);
        self.apply_aura(source, target, aura)?;
        if let Some(active) = self
            .actors
            .get_mut(target.index())
            .and_then(|t| t.auras.get_mut(aura))
        {
            active.rolling_pool = Some(carried + amount);
        }
        Ok(())
    }
}
