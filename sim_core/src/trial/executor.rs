//! Cast execution: checks, costs, cast completion and landing

use super::decision::TrialView;
use super::{SimEvent, Trial};
use crate::actor::Hardcast;
use crate::apl::secs_to_duration;
use crate::aura::{ModifierPolicy, ModifierSnapshot};
use crate::bus::{CombatEvent, EventKind};
use crate::error::SimError;
use crate::spell::{
    final_amount, Attempt, EffectKind, MagnitudeInputs, OutcomeTable, RejectReason, Spell, SpellResult,
};
use crate::types::{ActorId, OutcomeKind, ResourceKind, SpellId, SpellSchool, Unit};
use std::time::Duration;
use tracing::trace;

impl<'a> Trial<'a> {
    /// Try to cast `spell` on `target`.
    ///
    /// A rejected attempt changes nothing except the rejection count: no
    /// cost is paid, no cooldown starts and nothing is published.
    pub fn attempt(&mut self, caster: ActorId, spell: SpellId, target: ActorId) -> Result<Attempt, SimError> {
        let registry = self.registry;
        let spell = registry
            .spell(spell)
            .ok_or_else(|| self.invariant(caster, "cast", format!("unknown spell {}", spell.0)))?;
        let now = self.now();

        if let Some(reason) = self.check_castable(caster, spell)? {
            self.metrics.rejections += 1;
            self.log(caster, || format!("cannot cast {}: {}", spell.name, reason));
            return Ok(Attempt::Rejected(reason));
        }

        let constants = &registry.constants;
        let haste = self.actor_mut(caster, "cast")?.haste_multiplier();
        self.pay_cost(caster, spell)?;

        let actor = self.actor_mut(caster, "cast")?;
        actor.start_spell_cooldown(spell, now.saturating_add(spell.cooldown));
        if spell.on_gcd {
            let base = spell.gcd.unwrap_or(constants.gcd.base);
            actor.gcd_ready = now.saturating_add(hasted(base, haste).max(constants.gcd.floor.min(base)));
        }
        let cast_time = hasted(spell.cast_time, haste);

        self.metrics.casts += 1;
        self.metrics.spell_mut(&spell.name).casts += 1;
        trace!(at = ?now, spell = %spell.name, ?cast_time, "cast");
        self.log(caster, || format!("begins casting {}", spell.name));
        self.publish(
            CombatEvent::new(EventKind::CastStarted, now, caster, target).with_spell(spell.id, spell.school),
        )?;

        if cast_time.is_zero() {
            let results = self.complete_cast(caster, spell.id, target)?;
            return Ok(Attempt::Resolved(results));
        }

        let completes_at = now.saturating_add(cast_time);
        let handle = self.scheduler.schedule_at(
            completes_at,
            SimEvent::CastComplete {
                caster,
                spell: spell.id,
                target,
            },
        );
        self.actor_mut(caster, "cast")?.hardcast = Some(Hardcast {
            spell: spell.id,
            target,
            completes_at,
            handle,
        });
        Ok(Attempt::Casting { completes_at })
    }

    /// Casts made before the pull. Each resolves at time zero; its cooldown
    /// and any aura it applied are then aged by its lead. Prepull casts
    /// ignore the GCD and rotation conditions.
    pub(crate) fn prepull(&mut self) -> Result<(), SimError> {
        let registry = self.registry;
        let caster = ActorId::PLAYER;
        for action in &registry.rotation.prepull {
            let spell = registry
                .spell(action.spell)
                .ok_or_else(|| self.invariant(caster, "prepull", format!("unknown spell {}", action.spell.0)))?;
            let now = self.now();

            let player = self.player();
            let reason = if !player.cooldown_remaining(spell.id, now).is_zero() {
                Some(RejectReason::OnCooldown)
            } else if spell.cost.is_some_and(|cost| {
                !player
                    .resource(cost.resource)
                    .is_some_and(|pool| pool.can_spend(now, cost.amount))
            }) {
                Some(RejectReason::InsufficientResource)
            } else {
                None
            };
            if let Some(reason) = reason {
                self.metrics.rejections += 1;
                self.log(caster, || format!("cannot precast {}: {}", spell.name, reason));
                continue;
            }

            self.pay_cost(caster, spell)?;
            let ready_at = now.saturating_add(spell.cooldown).saturating_sub(action.lead);
            self.actor_mut(caster, "prepull")?.start_spell_cooldown(spell, ready_at);
            self.metrics.casts += 1;
            self.metrics.spell_mut(&spell.name).casts += 1;
            self.log(caster, || {
                format!("precasts {} {:.1}s before the pull", spell.name, action.lead.as_secs_f64())
            });

            let target = self.primary_target();
            self.complete_cast(caster, spell.id, target)?;
            if let Some((aura, _)) = spell.applies_aura {
                self.age_aura(aura, action.lead);
            }
        }
        Ok(())
    }

    fn pay_cost(&mut self, caster: ActorId, spell: &Spell) -> Result<(), SimError> {
        let Some(cost) = spell.cost else {
            return Ok(());
        };
        let now = self.now();
        let spent = self
            .actor_mut(caster, &spell.name)?
            .resource_mut(cost.resource)
            .map(|pool| pool.spend(now, cost.amount));
        match spent {
            Some(Ok(_)) => {
                self.metrics.record_spent(cost.resource, cost.amount);
                Ok(())
            }
            Some(Err(e)) => Err(self.invariant(caster, &spell.name, e.to_string())),
            None => Err(self.invariant(caster, &spell.name, format!("no {} pool", cost.resource))),
        }
    }

    /// Checks in order: cooldowns, cost, condition, in-progress cast
    fn check_castable(&self, caster: ActorId, spell: &Spell) -> Result<Option<RejectReason>, SimError> {
        let now = self.now();
        let actor = self
            .actor(caster)
            .ok_or_else(|| self.invariant(ActorId::PLAYER, "cast", format!("no actor {}", caster.0)))?;

        let gcd_blocked = spell.on_gcd && !actor.gcd_remaining(now).is_zero();
        if gcd_blocked || !actor.cooldown_remaining(spell.id, now).is_zero() {
            return Ok(Some(RejectReason::OnCooldown));
        }
        if let Some(cost) = spell.cost {
            let affordable = actor
                .resource(cost.resource)
                .is_some_and(|pool| pool.can_spend(now, cost.amount));
            if !affordable {
                return Ok(Some(RejectReason::InsufficientResource));
            }
        }
        if let Some(condition) = &spell.condition {
            if !condition.eval_bool(&TrialView::new(self)) {
                return Ok(Some(RejectReason::ConditionFalse));
            }
        }
        if actor.is_casting(now) && !spell.is_instant() {
            return Ok(Some(RejectReason::BusyCasting));
        }
        Ok(None)
    }

    /// Resolve a spell whose cast just finished, or that was triggered
    pub(crate) fn complete_cast(
        &mut self,
        caster: ActorId,
        spell: SpellId,
        target: ActorId,
    ) -> Result<Vec<SpellResult>, SimError> {
        let registry = self.registry;
        let spell = registry
            .spell(spell)
            .ok_or_else(|| self.invariant(caster, "resolve", format!("unknown spell {}", spell.0)))?;
        let now = self.now();
        self.publish(
            CombatEvent::new(EventKind::CastCompleted, now, caster, target).with_spell(spell.id, spell.school),
        )?;

        let targets = self.spell_targets(caster, spell, target);
        let snapshot = self
            .actor(caster)
            .map(|a| a.snapshot(registry, spell.school))
            .unwrap_or_default();
        let travel = spell.travel_time(registry.encounter.distance);

        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let (result, base) = self.resolve_on(caster, spell, target, &snapshot);
            results.push(result.clone());
            if travel.is_zero() {
                self.land(result)?;
            } else {
                self.scheduler.schedule(travel, SimEvent::Land { result, base });
            }
        }
        Ok(results)
    }

    /// Cast a spell for free from a proc, skipping every check
    pub(crate) fn cast_triggered(&mut self, caster: ActorId, spell: SpellId, target: ActorId) -> Result<(), SimError> {
        let registry = self.registry;
        if let Some(template) = registry.spell(spell) {
            self.metrics.spell_mut(&template.name).casts += 1;
        }
        self.complete_cast(caster, spell, target).map(|_| ())
    }

    fn spell_targets(&self, caster: ActorId, spell: &Spell, requested: ActorId) -> Vec<ActorId> {
        let on_self = matches!(spell.applies_aura, Some((_, Unit::Player)));
        if spell.effect == EffectKind::Heal || (spell.effect == EffectKind::None && on_self) {
            return vec![caster];
        }
        if spell.aoe {
            return self.living_targets();
        }
        if requested != caster && self.actor(requested).is_some_and(|a| a.is_alive()) {
            return vec![requested];
        }
        let fallback = self.primary_target();
        if self.actor(fallback).is_some_and(|a| a.is_alive()) {
            vec![fallback]
        } else {
            Vec::new()
        }
    }

    /// Roll the outcome and magnitude of one spell on one target
    fn resolve_on(
        &mut self,
        caster: ActorId,
        spell: &Spell,
        target: ActorId,
        snapshot: &ModifierSnapshot,
    ) -> (SpellResult, f64) {
        let heal = spell.effect == EffectKind::Heal;
        let mut result = SpellResult {
            spell: spell.id,
            caster,
            target,
            school: spell.school,
            outcome: OutcomeKind::Hit,
            raw: 0.0,
            amount: 0.0,
            heal,
        };
        if spell.effect == EffectKind::None {
            return (result, 0.0);
        }

        let (Some(attacker), Some(defender)) = (self.actor(caster), self.actor(target)) else {
            return (result, 0.0);
        };
        let crit_percent = snapshot.crit_percent + spell.mods.crit_percent;
        let mut table = OutcomeTable::build(spell.table, &attacker.derived, crit_percent, &defender.defense);
        if !spell.can_crit {
            table = table.without_crit();
        }
        let inputs = self.magnitude_inputs(spell, target);

        result.outcome = table.roll(&mut self.rng);
        if !result.outcome.landed() {
            return (result, 0.0);
        }
        let base = self.rng.range(spell.formula.min, spell.formula.upper());
        result.raw = base + spell.formula.coefficient * snapshot.scaling(spell.formula.scales_with);
        result.amount = final_amount(result.raw, result.outcome, snapshot, &inputs);
        (result, base)
    }

    pub(crate) fn magnitude_inputs(&self, spell: &Spell, target: ActorId) -> MagnitudeInputs {
        let combat = &self.registry.constants.combat;
        let mut inputs = self.inputs_for(
            spell.school,
            target,
            spell.mods.damage_percent,
            spell.crit_multiplier.unwrap_or(combat.crit_multiplier),
            spell.effect == EffectKind::Heal,
        );
        inputs.mastery_scaling = spell.mastery_scaling;
        inputs
    }

    pub(crate) fn inputs_for(
        &self,
        school: SpellSchool,
        target: ActorId,
        static_damage_percent: f64,
        crit_multiplier: f64,
        heal: bool,
    ) -> MagnitudeInputs {
        let registry = self.registry;
        let (taken_multiplier, armor) = self
            .actor(target)
            .map(|t| (t.damage_taken_multiplier(registry, school), t.defense.armor))
            .unwrap_or((1.0, 0.0));
        MagnitudeInputs {
            static_damage_percent,
            mastery_scaling: 0.0,
            crit_multiplier,
            block_reduction: registry.constants.combat.block_reduction,
            taken_multiplier,
            armor,
            armor_constant: registry.constants.combat.armor_constant,
            school,
            heal,
        }
    }

    /// A projectile arrives. Live spells read the caster's modifiers again.
    pub(crate) fn land_delayed(&mut self, mut result: SpellResult, base: f64) -> Result<(), SimError> {
        let registry = self.registry;
        let spell = registry
            .spell(result.spell)
            .ok_or_else(|| self.invariant(result.caster, "land", format!("unknown spell {}", result.spell.0)))?;
        if spell.policy == ModifierPolicy::Live && result.landed() {
            if let Some(caster) = self.actor(result.caster) {
                let snapshot = caster.snapshot(registry, spell.school);
                result.raw = base + spell.formula.coefficient * snapshot.scaling(spell.formula.scales_with);
                let inputs = self.magnitude_inputs(spell, result.target);
                result.amount = final_amount(result.raw, result.outcome, &snapshot, &inputs);
            }
        }
        self.land(result)
    }

    /// Apply a resolved spell to its target
    pub(crate) fn land(&mut self, result: SpellResult) -> Result<(), SimError> {
        let registry = self.registry;
        let spell = registry
            .spell(result.spell)
            .ok_or_else(|| self.invariant(result.caster, "land", format!("unknown spell {}", result.spell.0)))?;

        let mut amount = result.amount;
        if result.heal {
            let (effective, overheal) = self.heal(result.target, result.amount)?;
            self.metrics.total_healing += effective;
            self.metrics.overhealing += overheal;
            self.metrics.spell_mut(&spell.name).healing += effective;
            amount = effective;
        } else if spell.effect == EffectKind::Damage {
            amount = self.deal_damage(result.target, result.amount)?;
            self.metrics.total_damage += amount;
            self.metrics.spell_mut(&spell.name).damage += amount;
        }

        let breakdown = self.metrics.spell_mut(&spell.name);
        if result.landed() {
            breakdown.hits += 1;
            if result.outcome.is_crit() {
                breakdown.crits += 1;
            }
        } else {
            breakdown.misses += 1;
        }
        let target_name = self.actor_name(result.target).to_string();
        self.log(result.caster, || {
            format!("{} {:?} {} for {:.0}", spell.name, result.outcome, target_name, amount)
        });

        if result.landed() {
            if let Some(gain) = spell.generates {
                self.gain_resource(result.caster, gain.resource, gain.amount)?;
            }
            if let Some((aura, unit)) = spell.applies_aura {
                let recipient = match unit {
                    Unit::Player => result.caster,
                    Unit::Target => result.target,
                };
                self.apply_aura(result.caster, recipient, aura)?;
            }
        }

        self.publish(
            CombatEvent::new(EventKind::SpellResolved, self.now(), result.caster, result.target)
                .with_spell(spell.id, spell.school)
                .with_outcome(result.outcome, amount),
        )
    }

    pub(crate) fn gain_resource(
        &mut self,
        actor: ActorId,
        kind: ResourceKind,
        amount: f64,
    ) -> Result<(), SimError> {
        let now = self.now();
        let gained = self
            .actor_mut(actor, "gain resource")?
            .resource_mut(kind)
            .map(|pool| pool.gain(now, amount));
        match gained {
            Some(Ok(gained)) => {
                self.metrics.record_gained(kind, gained);
                Ok(())
            }
            Some(Err(e)) => Err(self.invariant(actor, "gain resource", e.to_string())),
            None => Err(self.invariant(actor, "gain resource", format!("no {} pool", kind))),
        }
    }
}

fn hasted(duration: Duration, haste: f64) -> Duration {
    secs_to_duration(duration.as_secs_f64() / haste)
}
