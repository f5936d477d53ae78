//! Active aura instances on a unit

use super::{Aura, ModifierSnapshot};
use crate::scheduler::EventHandle;
use crate::types::{ActorId, AuraId};
use std::time::Duration;

/// An aura currently up on a unit
#[derive(Debug, Clone)]
pub struct ActiveAura {
    pub aura: AuraId,
    /// Actor that applied (or last refreshed) the aura
    pub source: ActorId,
    pub stacks: u32,
    /// `None` for auras that last the whole encounter
    pub expires_at: Option<Duration>,
    pub expire_handle: Option<EventHandle>,
    pub tick_handle: Option<EventHandle>,
    pub next_tick: Option<Duration>,
    /// Source modifiers captured when the periodic effect was applied
    pub snapshot: Option<ModifierSnapshot>,
    /// Undealt damage of an ignite-style effect
    pub rolling_pool: Option<f64>,
}

impl ActiveAura {
    pub fn new(aura: &Aura, source: ActorId, now: Duration) -> Self {
        ActiveAura {
            aura: aura.id,
            source,
            stacks: 1,
            expires_at: aura.duration.map(|d| now.saturating_add(d)),
            expire_handle: None,
            tick_handle: None,
            next_tick: None,
            snapshot: None,
            rolling_pool: None,
        }
    }

    pub fn remaining(&self, now: Duration) -> Duration {
        match self.expires_at {
            Some(at) => at.saturating_sub(now),
            None => Duration::MAX,
        }
    }

    /// Ticks still to come, counting one due at `now`
    pub fn ticks_left(&self, now: Duration, interval: Duration) -> u32 {
        let Some(expires_at) = self.expires_at else {
            return 1;
        };
        let interval = interval.as_nanos();
        if interval == 0 || now > expires_at {
            return 0;
        }
        ((expires_at - now).as_nanos() / interval) as u32 + 1
    }
}

/// How an application changed the aura set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    Gained,
    Refreshed,
    Stacked,
    RefreshedAndStacked,
    /// Already at max stacks under a stack-only policy
    Unchanged,
}

impl Application {
    pub fn refreshed(self) -> bool {
        matches!(self, Application::Refreshed | Application::RefreshedAndStacked)
    }

    pub fn stacked(self) -> bool {
        matches!(self, Application::Stacked | Application::RefreshedAndStacked)
    }
}

/// All auras on one unit. Holds at most one instance per aura identity.
#[derive(Debug, Clone, Default)]
pub struct AuraSet {
    active: Vec<ActiveAura>,
}

impl AuraSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveAura> {
        self.active.iter()
    }

    pub fn get(&self, aura: AuraId) -> Option<&ActiveAura> {
        self.active.iter().find(|a| a.aura == aura)
    }

    pub fn get_mut(&mut self, aura: AuraId) -> Option<&mut ActiveAura> {
        self.active.iter_mut().find(|a| a.aura == aura)
    }

    pub fn contains(&self, aura: AuraId) -> bool {
        self.get(aura).is_some()
    }

    pub fn stacks(&self, aura: AuraId) -> u32 {
        self.get(aura).map(|a| a.stacks).unwrap_or(0)
    }

    pub fn remaining(&self, aura: AuraId, now: Duration) -> Duration {
        self.get(aura)
            .map(|a| a.remaining(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Apply `aura`, updating an existing instance in place.
    ///
    /// Only the aura state changes here: the caller owns the scheduler and
    /// re-arms expiry and tick events according to the returned outcome.
    pub fn apply(&mut self, aura: &Aura, source: ActorId, now: Duration) -> Application {
        let Some(existing) = self.get_mut(aura.id) else {
            self.active.push(ActiveAura::new(aura, source, now));
            return Application::Gained;
        };

        let policy = aura.stacking;
        let can_stack = policy.stacks() && existing.stacks < aura.max_stacks;
        if can_stack {
            existing.stacks += 1;
        }
        if policy.refreshes() {
            existing.expires_at = aura.duration.map(|d| now.saturating_add(d));
            existing.source = source;
        }

        match (policy.refreshes(), can_stack) {
            (true, true) => Application::RefreshedAndStacked,
            (true, false) => Application::Refreshed,
            (false, true) => Application::Stacked,
            (false, false) => Application::Unchanged,
        }
    }

    /// Remove an aura, returning the instance so its handles can be cancelled
    pub fn remove(&mut self, aura: AuraId) -> Option<ActiveAura> {
        let index = self.active.iter().position(|a| a.aura == aura)?;
        Some(self.active.remove(index))
    }

    pub fn clear(&mut self) -> Vec<ActiveAura> {
        std::mem::take(&mut self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::StackPolicy;
    use proptest::prelude::*;

    fn aura(id: usize, stacking: StackPolicy, max_stacks: u32) -> Aura {
        Aura {
            id: AuraId(id),
            name: format!("aura{}", id),
            duration: Some(Duration::from_secs(10)),
            max_stacks,
            stacking,
            modifiers: Vec::new(),
            periodic: None,
        }
    }

    #[test]
    fn test_refresh_resets_duration() {
        let template = aura(0, StackPolicy::Refresh, 1);
        let mut set = AuraSet::new();
        assert_eq!(set.apply(&template, ActorId::PLAYER, Duration::ZERO), Application::Gained);
        assert_eq!(
            set.apply(&template, ActorId::PLAYER, Duration::from_secs(5)),
            Application::Refreshed
        );
        let active = set.get(AuraId(0)).unwrap();
        assert_eq!(active.expires_at, Some(Duration::from_secs(15)));
        assert_eq!(active.stacks, 1);
    }

    #[test]
    fn test_stack_keeps_duration_and_caps() {
        let template = aura(0, StackPolicy::Stack, 3);
        let mut set = AuraSet::new();
        set.apply(&template, ActorId::PLAYER, Duration::ZERO);
        set.apply(&template, ActorId::PLAYER, Duration::from_secs(1));
        set.apply(&template, ActorId::PLAYER, Duration::from_secs(2));
        assert_eq!(
            set.apply(&template, ActorId::PLAYER, Duration::from_secs(3)),
            Application::Unchanged
        );
        assert_eq!(set.stacks(AuraId(0)), 3);
        assert_eq!(set.remaining(AuraId(0), Duration::from_secs(3)), Duration::from_secs(7));
    }

    #[test]
    fn test_refresh_and_stack() {
        let template = aura(0, StackPolicy::RefreshAndStack, 2);
        let mut set = AuraSet::new();
        set.apply(&template, ActorId::PLAYER, Duration::ZERO);
        let outcome = set.apply(&template, ActorId::PLAYER, Duration::from_secs(4));
        assert_eq!(outcome, Application::RefreshedAndStacked);
        assert_eq!(set.stacks(AuraId(0)), 2);
        assert_eq!(
            set.apply(&template, ActorId::PLAYER, Duration::from_secs(6)),
            Application::Refreshed
        );
        assert_eq!(set.remaining(AuraId(0), Duration::from_secs(6)), Duration::from_secs(10));
    }

    #[test]
    fn test_ticks_left() {
        let template = aura(0, StackPolicy::Refresh, 1);
        let active = ActiveAura::new(&template, ActorId::PLAYER, Duration::ZERO);
        let interval = Duration::from_secs(2);
        assert_eq!(active.ticks_left(Duration::from_secs(2), interval), 5);
        assert_eq!(active.ticks_left(Duration::from_secs(10), interval), 1);
        assert_eq!(active.ticks_left(Duration::from_secs(11), interval), 0);
    }

    proptest! {
        #[test]
        fn prop_one_instance_per_identity(ops in proptest::collection::vec((0usize..4, any::<bool>()), 1..200)) {
            let templates: Vec<Aura> = (0..4)
                .map(|i| aura(i, [StackPolicy::Refresh, StackPolicy::Stack, StackPolicy::RefreshAndStack][i % 3], 5))
                .collect();
            let mut set = AuraSet::new();
            for (step, (id, remove)) in ops.into_iter().enumerate() {
                let now = Duration::from_millis(step as u64 * 100);
                if remove {
                    set.remove(AuraId(id));
                } else {
                    set.apply(&templates[id], ActorId::PLAYER, now);
                }
                for id in 0..4 {
                    let count = set.iter().filter(|a| a.aura == AuraId(id)).count();
                    prop_assert!(count <= 1);
                }
                for active in set.iter() {
                    prop_assert!(active.stacks >= 1 && active.stacks <= 5);
                }
            }
        }
    }
}
