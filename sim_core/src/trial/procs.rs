//! Publishing combat events and running the procs they trigger

use super::Trial;
use crate::bus::{CombatEvent, ProcEffect};
use crate::error::SimError;
use crate::types::{ActorId, Unit};

impl<'a> Trial<'a> {
    /// Deliver `event` to the proc bus and run every handler that fires.
    /// A re-entrant publish of a kind already in flight is dropped.
    pub(crate) fn publish(&mut self, event: CombatEvent) -> Result<(), SimError> {
        let Some(handlers) = self.bus.begin(&event, &mut self.rng) else {
            return Ok(());
        };
        let result = handlers
            .into_iter()
            .try_for_each(|index| self.fire_proc(index, &event));
        self.bus.end(event.kind);
        result
    }

    fn fire_proc(&mut self, index: usize, event: &CombatEvent) -> Result<(), SimError> {
        let registry = self.registry;
        let proc = registry
            .procs
            .get(index)
            .ok_or_else(|| self.invariant(event.source, "proc", format!("unknown proc {}", index)))?;
        *self.metrics.procs.entry(proc.name.clone()).or_insert(0) += 1;
        self.log(event.source, || format!("{} procs", proc.name));

        // Events aimed at the player fall back to the primary target
        let enemy = if event.target == ActorId::PLAYER {
            self.primary_target()
        } else {
            event.target
        };

        match proc.effect {
            ProcEffect::ApplyAura { aura, on } => {
                let recipient = match on {
                    Unit::Player => ActorId::PLAYER,
                    Unit::Target => enemy,
                };
                self.apply_aura(event.source, recipient, aura).map(|_| ())
            }
            ProcEffect::CastSpell { spell } => self.cast_triggered(event.source, spell, enemy),
            ProcEffect::GainResource { resource, amount } => self.gain_resource(event.source, resource, amount),
            ProcEffect::Ignite { aura, fraction } => {
                let amount = event.amount * fraction;
                if amount <= 0.0 {
                    return Ok(());
                }
                self.ignite(event.source, enemy, aura, amount)
            }
        }
    }
}
