//! Encounter configuration: duration, targets and incoming damage

use super::{opt_secs, secs};
use crate::types::SpellSchool;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Nominal fight length
    #[serde(with = "secs")]
    pub duration: Duration,
    /// Each trial's length is drawn uniformly from duration ± variation
    #[serde(default, with = "secs")]
    pub duration_variation: Duration,
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default)]
    pub target: TargetConfig,
    /// Distance to the targets in yards, used for projectile travel time
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub incoming_damage: Option<IncomingDamageConfig>,
}

fn default_target_count() -> usize {
    1
}

/// Defensive profile shared by every target in the encounter.
/// Chances are percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_name")]
    pub name: String,
    /// Target health; `None` means the target cannot die
    #[serde(default)]
    pub health: Option<f64>,
    #[serde(default)]
    pub armor: f64,
    #[serde(default)]
    pub spell_miss: f64,
    #[serde(default)]
    pub melee_miss: f64,
    #[serde(default)]
    pub dodge: f64,
    #[serde(default)]
    pub parry: f64,
    #[serde(default)]
    pub block: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            name: default_target_name(),
            health: None,
            armor: 0.0,
            spell_miss: 0.0,
            melee_miss: 0.0,
            dodge: 0.0,
            parry: 0.0,
            block: 0.0,
        }
    }
}

fn default_target_name() -> String {
    "Target Dummy".to_string()
}

/// Periodic damage taken by the player (tank and healer scenarios)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingDamageConfig {
    pub amount: f64,
    #[serde(with = "secs")]
    pub interval: Duration,
    #[serde(default = "default_incoming_school")]
    pub school: SpellSchool,
    /// First hit lands at this offset; defaults to one interval
    #[serde(default, with = "opt_secs")]
    pub first_at: Option<Duration>,
}

fn default_incoming_school() -> SpellSchool {
    SpellSchool::Physical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encounter() {
        let toml = r#"
duration = 180.0
duration_variation = 20.0
target_count = 3
distance = 25.0

[target]
health = 5000000.0
armor = 24835.0
spell_miss = 6.0

[incoming_damage]
amount = 12000.0
interval = 2.0
"#;

        let encounter: EncounterConfig = toml::from_str(toml).unwrap();
        assert_eq!(encounter.duration, Duration::from_secs(180));
        assert_eq!(encounter.duration_variation, Duration::from_secs(20));
        assert_eq!(encounter.target_count, 3);
        assert_eq!(encounter.target.health, Some(5_000_000.0));
        assert_eq!(encounter.target.name, "Target Dummy");
        let incoming = encounter.incoming_damage.unwrap();
        assert_eq!(incoming.school, SpellSchool::Physical);
        assert!(incoming.first_at.is_none());
    }

    #[test]
    fn test_defaults() {
        let encounter: EncounterConfig = toml::from_str("duration = 60.0").unwrap();
        assert_eq!(encounter.target_count, 1);
        assert_eq!(encounter.duration_variation, Duration::ZERO);
        assert!(encounter.incoming_damage.is_none());
    }
}
