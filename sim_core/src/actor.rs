//! Actor - per-trial combat state of the player or a target

use crate::aura::{AuraSet, ModifierSnapshot, ModifierTotals};
use crate::defense::DefenseProfile;
use crate::registry::Registry;
use crate::resource::ResourcePool;
use crate::scheduler::EventHandle;
use crate::spell::Spell;
use crate::stat_block::{DerivedStats, StatBlock, StatValue};
use crate::types::{ActorId, ResourceKind, SpellId, SpellSchool};
use std::time::Duration;

/// Stacked slows and negative haste rating bottom out here: casts take at
/// most 100 times their base time
pub const MIN_HASTE_MULTIPLIER: f64 = 0.01;

/// The single in-progress non-instant cast of an actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hardcast {
    pub spell: SpellId,
    pub target: ActorId,
    pub completes_at: Duration,
    pub handle: EventHandle,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    /// Stats without aura contributions
    pub stats: StatBlock,
    /// Stats with current aura contributions
    pub derived: DerivedStats,
    pub defense: DefenseProfile,
    pub resources: Vec<ResourcePool>,
    pub auras: AuraSet,
    /// Ready time per spell, indexed by SpellId
    cooldowns: Vec<Duration>,
    pub gcd_ready: Duration,
    pub hardcast: Option<Hardcast>,
    pub health: f64,
    pub max_health: f64,
    /// Whether the unit can die
    pub mortal: bool,
    pub died_at: Option<Duration>,
    /// Aura haste multiplier, cached with `derived`
    haste_from_auras: f64,
}

impl Actor {
    pub fn player(registry: &Registry) -> Self {
        let template = &registry.player;
        Actor {
            id: ActorId::PLAYER,
            name: template.name.clone(),
            stats: template.stats.clone(),
            derived: template.derived,
            defense: DefenseProfile {
                armor: template.derived.armor,
                ..Default::default()
            },
            resources: template.resources.clone(),
            auras: AuraSet::new(),
            cooldowns: vec![Duration::ZERO; registry.spells.len()],
            gcd_ready: Duration::ZERO,
            hardcast: None,
            health: template.derived.max_health,
            max_health: template.derived.max_health,
            mortal: false,
            died_at: None,
            haste_from_auras: 1.0,
        }
    }

    pub fn target(registry: &Registry, index: usize) -> Self {
        let config = &registry.encounter.target;
        let health = config.health.unwrap_or(f64::INFINITY);
        let name = if registry.encounter.target_count > 1 {
            format!("{} {}", config.name, index)
        } else {
            config.name.clone()
        };
        Actor {
            id: ActorId(index),
            name,
            stats: StatBlock::new(),
            derived: DerivedStats::default(),
            defense: DefenseProfile::from_target(config),
            resources: Vec::new(),
            auras: AuraSet::new(),
            cooldowns: Vec::new(),
            gcd_ready: Duration::ZERO,
            hardcast: None,
            health,
            max_health: health,
            mortal: config.health.is_some(),
            died_at: None,
            haste_from_auras: 1.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.died_at.is_none()
    }

    pub fn health_percent(&self) -> f64 {
        if !self.mortal || self.max_health <= 0.0 {
            return 100.0;
        }
        (self.health / self.max_health * 100.0).clamp(0.0, 100.0)
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.resources.iter().find(|p| p.kind == kind)
    }

    pub fn resource_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.resources.iter_mut().find(|p| p.kind == kind)
    }

    pub fn cooldown_ready(&self, spell: SpellId) -> Duration {
        self.cooldowns.get(spell.0).copied().unwrap_or(Duration::ZERO)
    }

    pub fn cooldown_remaining(&self, spell: SpellId, now: Duration) -> Duration {
        self.cooldown_ready(spell).saturating_sub(now)
    }

    fn start_cooldown(&mut self, spell: SpellId, ready_at: Duration) {
        if let Some(slot) = self.cooldowns.get_mut(spell.0) {
            *slot = ready_at;
        }
    }

    /// Start `spell`'s cooldown and lock its group until at least `ready_at`
    pub fn start_spell_cooldown(&mut self, spell: &Spell, ready_at: Duration) {
        if spell.cooldown.is_zero() {
            return;
        }
        self.start_cooldown(spell.id, ready_at);
        for &other in &spell.shared_cooldown {
            if self.cooldown_ready(other) < ready_at {
                self.start_cooldown(other, ready_at);
            }
        }
    }

    pub fn gcd_remaining(&self, now: Duration) -> Duration {
        self.gcd_ready.saturating_sub(now)
    }

    pub fn is_casting(&self, now: Duration) -> bool {
        self.hardcast.is_some_and(|h| h.completes_at > now)
    }

    pub fn remaining_cast_time(&self, now: Duration) -> Duration {
        self.hardcast
            .map(|h| h.completes_at.saturating_sub(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Earliest time the actor could act again
    pub fn idle_at(&self) -> Duration {
        let cast_end = self.hardcast.map(|h| h.completes_at).unwrap_or(Duration::ZERO);
        self.gcd_ready.max(cast_end)
    }

    /// Combined rating and aura haste multiplier, never below
    /// [`MIN_HASTE_MULTIPLIER`]
    pub fn haste_multiplier(&self) -> f64 {
        (self.derived.haste_multiplier() * self.haste_from_auras).max(MIN_HASTE_MULTIPLIER)
    }

    /// Recompute derived stats after auras that touch stats changed
    pub fn refresh_stats(&mut self, registry: &Registry) {
        let modifiers = ModifierTotals::stat_modifiers(&self.auras, &registry.auras);
        let mut block = self.stats.clone();
        for modifier in &modifiers {
            let value: &mut StatValue = block.stat_mut(modifier.stat);
            value.add(modifier.kind, modifier.value);
        }
        self.derived = block.derive(&registry.constants);
        self.haste_from_auras = ModifierTotals::collect(&self.auras, &registry.auras, None).haste_multiplier;
    }

    /// Capture this actor's outgoing modifiers for one school
    pub fn snapshot(&self, registry: &Registry, school: SpellSchool) -> ModifierSnapshot {
        let totals = ModifierTotals::collect(&self.auras, &registry.auras, Some(school));
        ModifierSnapshot::capture(&self.derived, &totals)
    }

    /// Multiplier on damage this actor takes from `school`
    pub fn damage_taken_multiplier(&self, registry: &Registry, school: SpellSchool) -> f64 {
        ModifierTotals::collect(&self.auras, &registry.auras, Some(school)).damage_taken_multiplier
    }
}
