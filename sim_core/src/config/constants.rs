//! Game constants configuration

use super::secs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable game constants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConstants {
    #[serde(default)]
    pub gcd: GcdConstants,
    #[serde(default)]
    pub ratings: RatingConstants,
    #[serde(default)]
    pub combat: CombatConstants,
    #[serde(default)]
    pub engine: EngineConstants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcdConstants {
    /// Unhasted global cooldown
    #[serde(default = "default_gcd", with = "secs")]
    pub base: Duration,
    /// Haste can never push the global cooldown below this
    #[serde(default = "default_min_gcd", with = "secs")]
    pub floor: Duration,
}

impl Default for GcdConstants {
    fn default() -> Self {
        GcdConstants {
            base: default_gcd(),
            floor: default_min_gcd(),
        }
    }
}

fn default_gcd() -> Duration {
    Duration::from_millis(1500)
}
fn default_min_gcd() -> Duration {
    Duration::from_secs(1)
}

/// Rating required for one percent (or one point) of the derived stat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConstants {
    #[serde(default = "default_crit_rating")]
    pub crit_per_percent: f64,
    #[serde(default = "default_haste_rating")]
    pub haste_per_percent: f64,
    #[serde(default = "default_hit_rating")]
    pub hit_per_percent: f64,
    #[serde(default = "default_hit_rating")]
    pub expertise_per_percent: f64,
    #[serde(default = "default_mastery_rating")]
    pub mastery_per_point: f64,
    /// Crit percent granted per point of agility or intellect
    #[serde(default = "default_crit_per_primary")]
    pub crit_per_primary: f64,
}

impl Default for RatingConstants {
    fn default() -> Self {
        RatingConstants {
            crit_per_percent: default_crit_rating(),
            haste_per_percent: default_haste_rating(),
            hit_per_percent: default_hit_rating(),
            expertise_per_percent: default_hit_rating(),
            mastery_per_point: default_mastery_rating(),
            crit_per_primary: default_crit_per_primary(),
        }
    }
}

fn default_crit_rating() -> f64 {
    600.0
}
fn default_haste_rating() -> f64 {
    425.0
}
fn default_hit_rating() -> f64 {
    340.0
}
fn default_mastery_rating() -> f64 {
    600.0
}
fn default_crit_per_primary() -> f64 {
    0.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConstants {
    /// Critical strike damage multiplier (2.0 = 200%)
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f64,
    /// Fraction of damage removed by a block
    #[serde(default = "default_block_reduction")]
    pub block_reduction: f64,
    /// Armor formula constant: reduction = armor / (armor + constant)
    #[serde(default = "default_armor_constant")]
    pub armor_constant: f64,
    /// Health granted per point of stamina
    #[serde(default = "default_health_per_stamina")]
    pub health_per_stamina: f64,
    /// Attack power granted per point of strength
    #[serde(default = "default_ap_per_strength")]
    pub attack_power_per_strength: f64,
    /// Spell power granted per point of intellect
    #[serde(default = "default_sp_per_intellect")]
    pub spell_power_per_intellect: f64,
}

impl Default for CombatConstants {
    fn default() -> Self {
        CombatConstants {
            crit_multiplier: default_crit_multiplier(),
            block_reduction: default_block_reduction(),
            armor_constant: default_armor_constant(),
            health_per_stamina: default_health_per_stamina(),
            attack_power_per_strength: default_ap_per_strength(),
            spell_power_per_intellect: default_sp_per_intellect(),
        }
    }
}

fn default_crit_multiplier() -> f64 {
    2.0
}
fn default_block_reduction() -> f64 {
    0.30
}
fn default_armor_constant() -> f64 {
    46257.5
}
fn default_health_per_stamina() -> f64 {
    14.0
}
fn default_ap_per_strength() -> f64 {
    2.0
}
fn default_sp_per_intellect() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConstants {
    /// Re-evaluation interval when no rotation rule can act
    #[serde(default = "default_poll_interval", with = "secs")]
    pub poll_interval: Duration,
    /// Absolute simulated-time ceiling for any trial
    #[serde(default = "default_max_sim_time", with = "secs")]
    pub max_sim_time: Duration,
}

impl Default for EngineConstants {
    fn default() -> Self {
        EngineConstants {
            poll_interval: default_poll_interval(),
            max_sim_time: default_max_sim_time(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}
fn default_max_sim_time() -> Duration {
    Duration::from_secs(3600)
}
