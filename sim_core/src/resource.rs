//! Resource pools - spendable and regenerating quantities on an actor

use crate::apl::secs_to_duration;
use crate::types::ResourceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Tolerance for floating-point drift when comparing pool values
const EPSILON: f64 = 1e-9;

/// A resource amount paid or gained by a spell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource: ResourceKind,
    pub amount: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("spending {amount} {kind} would leave the pool at {after}")]
    Overdrawn {
        kind: ResourceKind,
        amount: f64,
        after: f64,
    },
    #[error("negative amount {amount} for {kind}")]
    NegativeAmount { kind: ResourceKind, amount: f64 },
}

/// A single pool (mana, energy, embers...) with optional continuous regen.
///
/// Regeneration is settled lazily: the stored value is exact as of
/// `settled_at`, and reads project it forward to the requested time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub kind: ResourceKind,
    current: f64,
    max: f64,
    regen_per_second: f64,
    settled_at: Duration,
}

impl ResourcePool {
    pub fn new(kind: ResourceKind, max: f64, start: f64, regen_per_second: f64) -> Self {
        ResourcePool {
            kind,
            current: start.clamp(0.0, max),
            max,
            regen_per_second,
            settled_at: Duration::ZERO,
        }
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn regen_per_second(&self) -> f64 {
        self.regen_per_second
    }

    /// Value at `now`, including regeneration not yet settled
    pub fn value_at(&self, now: Duration) -> f64 {
        let elapsed = now.saturating_sub(self.settled_at).as_secs_f64();
        (self.current + self.regen_per_second * elapsed).min(self.max)
    }

    /// Fraction of the pool filled at `now` (0.0 to 1.0)
    pub fn fraction_at(&self, now: Duration) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.value_at(now) / self.max
    }

    /// Fold pending regeneration into the stored value
    pub fn settle(&mut self, now: Duration) {
        if now > self.settled_at {
            self.current = self.value_at(now);
            self.settled_at = now;
        }
    }

    pub fn can_spend(&self, now: Duration, amount: f64) -> bool {
        self.value_at(now) + EPSILON >= amount
    }

    /// Deduct `amount`, returning the pool value afterwards.
    ///
    /// Overdrawing the pool is an invariant violation, not a normal
    /// rejection: callers must check `can_spend` first.
    pub fn spend(&mut self, now: Duration, amount: f64) -> Result<f64, ResourceError> {
        if amount < 0.0 {
            return Err(ResourceError::NegativeAmount {
                kind: self.kind,
                amount,
            });
        }
        self.settle(now);
        let after = self.current - amount;
        if after < -EPSILON {
            return Err(ResourceError::Overdrawn {
                kind: self.kind,
                amount,
                after,
            });
        }
        self.current = after.max(0.0);
        Ok(self.current)
    }

    /// Add `amount` capped at max, returning how much was actually gained
    pub fn gain(&mut self, now: Duration, amount: f64) -> Result<f64, ResourceError> {
        if amount < 0.0 {
            return Err(ResourceError::NegativeAmount {
                kind: self.kind,
                amount,
            });
        }
        self.settle(now);
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        Ok(self.current - before)
    }

    /// Earliest time the pool will hold `amount`, if regeneration gets it there
    pub fn ready_at(&self, now: Duration, amount: f64) -> Option<Duration> {
        let value = self.value_at(now);
        if value + EPSILON >= amount {
            return Some(now);
        }
        if self.regen_per_second <= 0.0 || amount > self.max {
            return None;
        }
        let seconds = (amount - value) / self.regen_per_second;
        Some(now.saturating_add(secs_to_duration(seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spend_and_gain() {
        let mut pool = ResourcePool::new(ResourceKind::BurningEmbers, 40.0, 10.0, 0.0);
        assert!(pool.can_spend(Duration::ZERO, 10.0));
        assert!(!pool.can_spend(Duration::ZERO, 11.0));

        assert_eq!(pool.spend(Duration::ZERO, 10.0).unwrap(), 0.0);
        assert_eq!(pool.gain(Duration::ZERO, 50.0).unwrap(), 40.0);
        assert_eq!(pool.value_at(Duration::ZERO), 40.0);
    }

    #[test]
    fn test_overdraw_is_an_error() {
        let mut pool = ResourcePool::new(ResourceKind::Mana, 100.0, 5.0, 0.0);
        let err = pool.spend(Duration::ZERO, 6.0).unwrap_err();
        assert!(matches!(err, ResourceError::Overdrawn { .. }));
        // Failed spends leave the pool untouched
        assert_eq!(pool.value_at(Duration::ZERO), 5.0);
    }

    #[test]
    fn test_lazy_regen() {
        let mut pool = ResourcePool::new(ResourceKind::Energy, 100.0, 0.0, 10.0);
        assert!((pool.value_at(Duration::from_secs(3)) - 30.0).abs() < 1e-9);
        assert!((pool.value_at(Duration::from_secs(30)) - 100.0).abs() < 1e-9);

        pool.spend(Duration::from_secs(5), 50.0).unwrap();
        assert!(pool.value_at(Duration::from_secs(5)).abs() < 1e-9);
        assert!((pool.fraction_at(Duration::from_secs(6)) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_ready_at() {
        let pool = ResourcePool::new(ResourceKind::Energy, 100.0, 20.0, 10.0);
        assert_eq!(pool.ready_at(Duration::ZERO, 10.0), Some(Duration::ZERO));
        assert_eq!(pool.ready_at(Duration::ZERO, 50.0), Some(Duration::from_secs(3)));
        assert_eq!(pool.ready_at(Duration::ZERO, 150.0), None);

        let embers = ResourcePool::new(ResourceKind::BurningEmbers, 40.0, 0.0, 0.0);
        assert_eq!(embers.ready_at(Duration::ZERO, 10.0), None);

        // A trickle too slow to represent saturates instead of overflowing
        let trickle = ResourcePool::new(ResourceKind::Mana, 100.0, 0.0, 1e-300);
        assert_eq!(trickle.ready_at(Duration::from_secs(5), 50.0), Some(Duration::MAX));
    }

    proptest! {
        #[test]
        fn prop_pool_never_negative(ops in proptest::collection::vec((any::<bool>(), 0.0f64..50.0), 1..100)) {
            let mut pool = ResourcePool::new(ResourceKind::Rage, 100.0, 50.0, 0.0);
            for (is_spend, amount) in ops {
                if is_spend {
                    if pool.can_spend(Duration::ZERO, amount) {
                        pool.spend(Duration::ZERO, amount).unwrap();
                    }
                } else {
                    pool.gain(Duration::ZERO, amount).unwrap();
                }
                prop_assert!(pool.value_at(Duration::ZERO) >= 0.0);
                prop_assert!(pool.value_at(Duration::ZERO) <= pool.max());
            }
        }
    }
}
