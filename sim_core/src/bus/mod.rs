//! Proc bus - typed publish/subscribe for combat events
//!
//! Subscribers register a [`Trigger`] predicate plus a handler payload. The
//! bus itself never mutates combat state: `begin` returns the handlers that
//! fire for an event, in subscription order, and the trial runs them
//! before calling `end`. While an event kind is being delivered it cannot
//! re-trigger itself, so a proc that casts a spell cannot chain into the
//! same kind of event it was triggered by.

mod types;

pub use types::{
    CombatEvent, EventKind, OutcomeFilter, Proc, ProcConfig, ProcEffect, ProcEffectConfig, Trigger,
};

use crate::random::RandomStream;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub usize);

#[derive(Debug, Clone)]
struct Subscription<H> {
    trigger: Trigger,
    chance: f64,
    icd: Duration,
    ready_at: Duration,
    handler: H,
    fired: u64,
}

#[derive(Debug, Clone)]
pub struct ProcBus<H> {
    subscriptions: Vec<Subscription<H>>,
    /// Bitmask of event kinds currently being delivered
    in_flight: u32,
    published: [u64; EventKind::ALL.len()],
    suppressed: u64,
}

impl<H> Default for ProcBus<H> {
    fn default() -> Self {
        ProcBus {
            subscriptions: Vec::new(),
            in_flight: 0,
            published: [0; EventKind::ALL.len()],
            suppressed: 0,
        }
    }
}

impl<H: Clone> ProcBus<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, trigger: Trigger, chance: f64, icd: Duration, handler: H) -> SubscriptionId {
        self.subscriptions.push(Subscription {
            trigger,
            chance,
            icd,
            ready_at: Duration::ZERO,
            handler,
            fired: 0,
        });
        SubscriptionId(self.subscriptions.len() - 1)
    }

    /// Start delivering `event`. Returns the handlers to run, or `None`
    /// when the same kind is already being delivered.
    ///
    /// Chance rolls are drawn from `rng` in subscription order, and only
    /// for subscriptions whose predicate matched and whose internal
    /// cooldown has elapsed.
    pub fn begin(&mut self, event: &CombatEvent, rng: &mut RandomStream) -> Option<Vec<H>> {
        let bit = event.kind.bit();
        if self.in_flight & bit != 0 {
            self.suppressed += 1;
            trace!(kind = ?event.kind, "re-entrant publish suppressed");
            return None;
        }
        self.in_flight |= bit;
        self.published[event.kind.index()] += 1;

        let mut handlers = Vec::new();
        for subscription in &mut self.subscriptions {
            if !subscription.trigger.matches(event) || event.time < subscription.ready_at {
                continue;
            }
            if !rng.chance(subscription.chance) {
                continue;
            }
            subscription.ready_at = event.time + subscription.icd;
            subscription.fired += 1;
            handlers.push(subscription.handler.clone());
        }
        Some(handlers)
    }

    /// Finish delivering an event of `kind`
    pub fn end(&mut self, kind: EventKind) {
        self.in_flight &= !kind.bit();
    }

    /// Events of `kind` published so far (suppressed re-entrant ones excluded)
    pub fn published(&self, kind: EventKind) -> u64 {
        self.published[kind.index()]
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn fired(&self, id: SubscriptionId) -> u64 {
        self.subscriptions.get(id.0).map(|s| s.fired).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorId;

    fn event(kind: EventKind, secs: u64) -> CombatEvent {
        CombatEvent::new(kind, Duration::from_secs(secs), ActorId::PLAYER, ActorId(1))
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let mut bus = ProcBus::new();
        let mut rng = RandomStream::from_seed(1);
        bus.subscribe(Trigger::on(EventKind::CastCompleted), 1.0, Duration::ZERO, "first");
        bus.subscribe(Trigger::on(EventKind::SpellResolved), 1.0, Duration::ZERO, "other");
        bus.subscribe(Trigger::on(EventKind::CastCompleted), 1.0, Duration::ZERO, "second");

        let handlers = bus.begin(&event(EventKind::CastCompleted, 0), &mut rng).unwrap();
        bus.end(EventKind::CastCompleted);
        assert_eq!(handlers, vec!["first", "second"]);
        assert_eq!(bus.published(EventKind::CastCompleted), 1);
        assert_eq!(bus.published(EventKind::SpellResolved), 0);
    }

    #[test]
    fn test_reentrant_kind_is_suppressed() {
        let mut bus = ProcBus::new();
        let mut rng = RandomStream::from_seed(1);
        bus.subscribe(Trigger::on(EventKind::SpellResolved), 1.0, Duration::ZERO, 0);

        assert!(bus.begin(&event(EventKind::SpellResolved, 0), &mut rng).is_some());
        // A handler publishing the same kind mid-delivery gets nothing
        assert!(bus.begin(&event(EventKind::SpellResolved, 0), &mut rng).is_none());
        // Other kinds still go through
        assert!(bus.begin(&event(EventKind::AuraGained, 0), &mut rng).is_some());
        bus.end(EventKind::AuraGained);
        bus.end(EventKind::SpellResolved);

        assert!(bus.begin(&event(EventKind::SpellResolved, 1), &mut rng).is_some());
        bus.end(EventKind::SpellResolved);
        assert_eq!(bus.suppressed(), 1);
        assert_eq!(bus.published(EventKind::SpellResolved), 2);
    }

    #[test]
    fn test_internal_cooldown() {
        let mut bus = ProcBus::new();
        let mut rng = RandomStream::from_seed(1);
        let id = bus.subscribe(Trigger::on(EventKind::SpellResolved), 1.0, Duration::from_secs(10), ());

        for secs in [0, 5, 9, 10, 15, 20] {
            bus.begin(&event(EventKind::SpellResolved, secs), &mut rng);
            bus.end(EventKind::SpellResolved);
        }
        // fires at 0, 10 and 20
        assert_eq!(bus.fired(id), 3);
    }

    #[test]
    fn test_chance_is_roughly_honoured() {
        let mut bus = ProcBus::new();
        let mut rng = RandomStream::from_seed(99);
        let id = bus.subscribe(Trigger::on(EventKind::SpellResolved), 0.25, Duration::ZERO, ());
        for secs in 0..4000 {
            bus.begin(&event(EventKind::SpellResolved, secs), &mut rng);
            bus.end(EventKind::SpellResolved);
        }
        let rate = bus.fired(id) as f64 / 4000.0;
        assert!((rate - 0.25).abs() < 0.03, "rate was {}", rate);
    }
}
