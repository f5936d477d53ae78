//! Defense system - armor and the avoidance profile of a unit

mod armor;

pub use armor::{apply_armor, armor_needed_for_reduction, armor_reduction};

use crate::config::TargetConfig;
use serde::{Deserialize, Serialize};

/// Avoidance chances and armor of a unit. Chances are percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DefenseProfile {
    pub armor: f64,
    pub spell_miss: f64,
    pub melee_miss: f64,
    pub dodge: f64,
    pub parry: f64,
    pub block: f64,
}

impl DefenseProfile {
    pub fn from_target(target: &TargetConfig) -> Self {
        DefenseProfile {
            armor: target.armor,
            spell_miss: target.spell_miss,
            melee_miss: target.melee_miss,
            dodge: target.dodge,
            parry: target.parry,
            block: target.block,
        }
    }
}
