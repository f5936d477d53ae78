//! Registry - the validated, immutable form of a SimConfig
//!
//! Built once per run and shared by reference with every trial. All name
//! references are resolved to indices here, so configuration mistakes
//! surface before any trial starts.

use crate::apl::{NameResolver, Rotation, Value};
use crate::aura::{Aura, AuraConfig, AuraModifier};
use crate::bus::{Proc, ProcConfig, ProcEffect, ProcEffectConfig, Trigger};
use crate::config::{ConfigError, EncounterConfig, GameConstants, SimConfig, TalentConfig};
use crate::resource::{ResourceCost, ResourcePool};
use crate::source::{BaseStatsSource, ConsumableSource, GearSource, StatSource, TalentSource};
use crate::spell::{Spell, SpellConfig, SpellModConfig, SpellModKind, StaticMods};
use crate::stat_block::{DerivedStats, StatBlock};
use crate::types::{ActorId, AuraId, ResourceKind, SpellId};
use std::collections::HashMap;
use tracing::debug;

/// Name tables built before anything is compiled
#[derive(Debug, Clone, Default)]
struct Names {
    spells: HashMap<String, SpellId>,
    auras: HashMap<String, AuraId>,
    resources: Vec<ResourceKind>,
}

impl NameResolver for Names {
    fn spell(&self, name: &str) -> Option<SpellId> {
        self.spells.get(name).copied()
    }

    fn aura(&self, name: &str) -> Option<AuraId> {
        self.auras.get(name).copied()
    }

    fn has_resource(&self, kind: ResourceKind) -> bool {
        self.resources.contains(&kind)
    }
}

/// The player as it enters every trial
#[derive(Debug, Clone)]
pub struct PlayerTemplate {
    pub name: String,
    pub stats: StatBlock,
    pub derived: DerivedStats,
    pub resources: Vec<ResourcePool>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub constants: GameConstants,
    pub player: PlayerTemplate,
    pub spells: Vec<Spell>,
    pub auras: Vec<Aura>,
    /// Procs active for this character, in subscription order
    pub procs: Vec<Proc>,
    pub rotation: Rotation,
    pub encounter: EncounterConfig,
    names: Names,
}

impl Registry {
    pub fn build(config: &SimConfig) -> Result<Self, ConfigError> {
        validate_engine(config)?;

        let mut names = Names::default();
        for (index, spell) in config.spells.iter().enumerate() {
            if names.spells.insert(spell.id.clone(), SpellId(index)).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate spell id '{}'",
                    spell.id
                )));
            }
        }
        for (index, aura) in config.auras.iter().enumerate() {
            if names.auras.insert(aura.id.clone(), AuraId(index)).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate aura id '{}'",
                    aura.id
                )));
            }
        }

        let talents = select_talents(config)?;
        let stats = build_stat_block(config, &talents);
        let derived = stats.derive(&config.constants);
        let resources = build_resources(config, &derived)?;
        names.resources = resources.iter().map(|r| r.kind).collect();

        let auras = config
            .auras
            .iter()
            .enumerate()
            .map(|(index, aura)| compile_aura(aura, AuraId(index)))
            .collect::<Result<Vec<_>, _>>()?;

        let spell_mods: Vec<&SpellModConfig> = config
            .spell_mods
            .iter()
            .chain(talents.iter().flat_map(|t| t.spell_mods.iter()))
            .collect();
        let spells = config
            .spells
            .iter()
            .enumerate()
            .map(|(index, spell)| compile_spell(spell, SpellId(index), &config.spells, &spell_mods, &names))
            .collect::<Result<Vec<_>, _>>()?;

        let procs = compile_procs(config, &talents, &names)?;
        let rotation = Rotation::compile(&config.rotation, &names)?;

        debug!(
            character = %config.character.name,
            spells = spells.len(),
            auras = auras.len(),
            procs = procs.len(),
            rules = rotation.rules.len(),
            "registry built"
        );

        Ok(Registry {
            constants: config.constants.clone(),
            player: PlayerTemplate {
                name: config.character.name.clone(),
                stats,
                derived,
                resources,
            },
            spells,
            auras,
            procs,
            rotation,
            encounter: config.encounter.clone(),
            names,
        })
    }

    pub fn spell(&self, id: SpellId) -> Option<&Spell> {
        self.spells.get(id.0)
    }

    pub fn aura(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(id.0)
    }

    pub fn spell_id(&self, name: &str) -> Option<SpellId> {
        self.names.spell(name)
    }

    pub fn aura_id(&self, name: &str) -> Option<AuraId> {
        self.names.aura(name)
    }

    pub fn aura_name(&self, id: AuraId) -> &str {
        self.aura(id).map(|a| a.name.as_str()).unwrap_or("?")
    }
}

fn validate_engine(config: &SimConfig) -> Result<(), ConfigError> {
    let constants = &config.constants;
    let encounter = &config.encounter;
    let invalid = |message: &str| Err(ConfigError::ValidationError(message.to_string()));

    if constants.engine.poll_interval.is_zero() {
        return invalid("poll_interval must be positive");
    }
    if constants.engine.max_sim_time.is_zero() {
        return invalid("max_sim_time must be positive");
    }
    if constants.gcd.base.is_zero() {
        return invalid("base global cooldown must be positive");
    }
    if encounter.duration.is_zero() {
        return invalid("encounter duration must be positive");
    }
    if encounter.duration_variation > encounter.duration {
        return invalid("duration_variation cannot exceed the duration");
    }
    if encounter.target_count == 0 {
        return invalid("encounter needs at least one target");
    }
    if encounter.distance < 0.0 {
        return invalid("distance cannot be negative");
    }
    if let Some(incoming) = &encounter.incoming_damage {
        if incoming.interval.is_zero() {
            return invalid("incoming damage interval must be positive");
        }
    }
    Ok(())
}

fn select_talents(config: &SimConfig) -> Result<Vec<&TalentConfig>, ConfigError> {
    let character = &config.character;
    character
        .talents
        .iter()
        .map(|id| (id, "talent"))
        .chain(character.glyphs.iter().map(|id| (id, "glyph")))
        .map(|(id, kind)| {
            config
                .talents
                .iter()
                .find(|t| &t.id == id)
                .ok_or_else(|| ConfigError::unknown(kind, id, format!("character '{}'", character.name)))
        })
        .collect()
}

fn build_stat_block(config: &SimConfig, talents: &[&TalentConfig]) -> StatBlock {
    let base = BaseStatsSource::new(config.character.base.clone());
    let gear: Vec<GearSource> = config.character.gear.iter().map(GearSource::new).collect();
    let talent = TalentSource::new(talents.to_vec());

    let consumables: Vec<ConsumableSource> = config
        .character
        .consumables
        .iter()
        .map(ConsumableSource::new)
        .collect();

    let mut sources: Vec<&dyn StatSource> = vec![&base, &talent];
    sources.extend(gear.iter().map(|g| g as &dyn StatSource));
    sources.extend(consumables.iter().map(|c| c as &dyn StatSource));
    debug!(
        sources = ?sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
        "stat sources"
    );
    StatBlock::from_sources(&sources)
}

fn build_resources(config: &SimConfig, derived: &DerivedStats) -> Result<Vec<ResourcePool>, ConfigError> {
    let mut pools: Vec<ResourcePool> = Vec::new();
    for resource in &config.character.resources {
        if pools.iter().any(|p| p.kind == resource.kind) {
            return Err(ConfigError::ValidationError(format!(
                "resource {} declared twice",
                resource.kind
            )));
        }
        let max = match (resource.max, resource.kind) {
            (Some(max), _) => max,
            (None, ResourceKind::Mana) => derived.max_mana,
            (None, kind) => {
                return Err(ConfigError::ValidationError(format!(
                    "resource {} needs a max",
                    kind
                )))
            }
        };
        if max <= 0.0 || resource.regen_per_second < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "resource {} needs a positive max and non-negative regen",
                resource.kind
            )));
        }
        let start = resource.start.unwrap_or(max);
        pools.push(ResourcePool::new(resource.kind, max, start, resource.regen_per_second));
    }
    Ok(pools)
}

/// Configured display name, or the id when none is given
fn display_name(name: &str, id: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

fn compile_aura(config: &AuraConfig, id: AuraId) -> Result<Aura, ConfigError> {
    if config.max_stacks == 0 {
        return Err(ConfigError::ValidationError(format!(
            "aura '{}' needs max_stacks of at least 1",
            config.id
        )));
    }
    if config.duration.is_some_and(|d| d.is_zero()) {
        return Err(ConfigError::ValidationError(format!(
            "aura '{}' has a zero duration",
            config.id
        )));
    }
    for modifier in &config.modifiers {
        if let AuraModifier::Haste { percent } = *modifier {
            if percent <= -100.0 {
                return Err(ConfigError::ValidationError(format!(
                    "aura '{}' slows casting by {}%, which would stop it entirely",
                    config.id, -percent
                )));
            }
        }
    }
    if let Some(periodic) = &config.periodic {
        if periodic.interval.is_zero() {
            return Err(ConfigError::ValidationError(format!(
                "aura '{}' has a zero tick interval",
                config.id
            )));
        }
    }
    Ok(Aura {
        id,
        name: display_name(&config.name, &config.id),
        duration: config.duration,
        max_stacks: config.max_stacks,
        stacking: config.stacking,
        modifiers: config.modifiers.clone(),
        periodic: config.periodic.clone(),
    })
}

fn check_resource(cost: Option<ResourceCost>, names: &Names, spell: &str) -> Result<(), ConfigError> {
    match cost {
        Some(cost) if !names.has_resource(cost.resource) => Err(ConfigError::unknown(
            "resource",
            &cost.resource.to_string(),
            format!("spell '{}'", spell),
        )),
        Some(cost) if cost.amount < 0.0 => Err(ConfigError::ValidationError(format!(
            "spell '{}' has a negative resource amount",
            spell
        ))),
        _ => Ok(()),
    }
}

fn compile_spell(
    config: &SpellConfig,
    id: SpellId,
    all: &[SpellConfig],
    spell_mods: &[&SpellModConfig],
    names: &Names,
) -> Result<Spell, ConfigError> {
    check_resource(config.cost, names, &config.id)?;
    check_resource(config.generates, names, &config.id)?;
    if config.missile_speed.is_some_and(|s| s <= 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "spell '{}' needs a positive missile_speed",
            config.id
        )));
    }

    let applies_aura = match &config.applies_aura {
        Some(application) => {
            let aura = names.aura(&application.aura).ok_or_else(|| {
                ConfigError::unknown("aura", &application.aura, format!("spell '{}'", config.id))
            })?;
            Some((aura, application.on))
        }
        None => None,
    };
    let condition = match &config.condition {
        Some(c) => Some(Value::compile_bool(c, names, &format!("spell '{}' condition", config.id))?),
        None => None,
    };

    let mut mods = StaticMods::default();
    let mut cost_percent = 0.0;
    let mut cast_time_percent = 0.0;
    for spell_mod in spell_mods.iter().filter(|m| m.applies_to(config)) {
        match spell_mod.kind {
            SpellModKind::DamageDonePercent => mods.damage_percent += spell_mod.value,
            SpellModKind::CritPercent => mods.crit_percent += spell_mod.value,
            SpellModKind::CostPercent => cost_percent += spell_mod.value,
            SpellModKind::CastTimePercent => cast_time_percent += spell_mod.value,
        }
    }
    let cost = config.cost.map(|c| ResourceCost {
        amount: (c.amount * (1.0 + cost_percent / 100.0)).max(0.0),
        ..c
    });
    let cast_time = config
        .cast_time
        .mul_f64((1.0 + cast_time_percent / 100.0).max(0.0));
    let shared_cooldown = match &config.cooldown_group {
        Some(group) => all
            .iter()
            .enumerate()
            .filter(|(index, other)| *index != id.0 && other.cooldown_group.as_ref() == Some(group))
            .map(|(index, _)| SpellId(index))
            .collect(),
        None => Vec::new(),
    };

    Ok(Spell {
        id,
        name: display_name(&config.name, &config.id),
        school: config.school,
        cast_time,
        on_gcd: config.on_gcd,
        gcd: config.gcd,
        cooldown: config.cooldown,
        shared_cooldown,
        cost,
        generates: config.generates,
        effect: config.effect,
        formula: config.formula,
        table: config.table,
        can_crit: config.can_crit,
        crit_multiplier: config.crit_multiplier,
        policy: config.policy,
        missile_speed: config.missile_speed,
        aoe: config.aoe,
        mastery_scaling: config.mastery_scaling,
        applies_aura,
        condition,
        mods,
    })
}

fn compile_procs(
    config: &SimConfig,
    talents: &[&TalentConfig],
    names: &Names,
) -> Result<Vec<Proc>, ConfigError> {
    let character = &config.character;
    let mut active: Vec<&str> = Vec::new();
    let selected = character
        .procs
        .iter()
        .chain(character.gear.iter().flat_map(|g| g.procs.iter()))
        .chain(talents.iter().flat_map(|t| t.procs.iter()));
    for id in selected {
        if !active.contains(&id.as_str()) {
            active.push(id);
        }
    }

    active
        .into_iter()
        .map(|id| {
            let proc = config
                .procs
                .iter()
                .find(|p| p.id == id)
                .ok_or_else(|| ConfigError::unknown("proc", id, format!("character '{}'", character.name)))?;
            compile_proc(proc, names)
        })
        .collect()
}

fn compile_proc(config: &ProcConfig, names: &Names) -> Result<Proc, ConfigError> {
    let context = || format!("proc '{}'", config.id);
    if !(0.0..=1.0).contains(&config.chance) {
        return Err(ConfigError::ValidationError(format!(
            "{} chance must be within 0..=1",
            context()
        )));
    }

    let spells = config
        .spells
        .iter()
        .map(|name| {
            names
                .spell(name)
                .ok_or_else(|| ConfigError::unknown("spell", name, context()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let aura = match &config.aura {
        Some(name) => Some(
            names
                .aura(name)
                .ok_or_else(|| ConfigError::unknown("aura", name, context()))?,
        ),
        None => None,
    };
    let resolve_aura = |name: &str| {
        names
            .aura(name)
            .ok_or_else(|| ConfigError::unknown("aura", name, context()))
    };

    let effect = match &config.effect {
        ProcEffectConfig::ApplyAura { aura, on } => ProcEffect::ApplyAura {
            aura: resolve_aura(aura)?,
            on: *on,
        },
        ProcEffectConfig::CastSpell { spell } => ProcEffect::CastSpell {
            spell: names
                .spell(spell)
                .ok_or_else(|| ConfigError::unknown("spell", spell, context()))?,
        },
        ProcEffectConfig::GainResource { resource, amount } => {
            if !names.has_resource(*resource) {
                return Err(ConfigError::unknown("resource", &resource.to_string(), context()));
            }
            ProcEffect::GainResource {
                resource: *resource,
                amount: *amount,
            }
        }
        ProcEffectConfig::Ignite { aura, fraction } => {
            let aura = resolve_aura(aura)?;
            if *fraction <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} ignite fraction must be positive",
                    context()
                )));
            }
            ProcEffect::Ignite {
                aura,
                fraction: *fraction,
            }
        }
    };

    Ok(Proc {
        name: config.id.clone(),
        trigger: Trigger {
            kind: config.on,
            spells,
            school: config.school,
            aura,
            outcome: config.outcome,
            source: ActorId::PLAYER,
        },
        chance: config.chance,
        icd: config.icd,
        effect,
    })
}
