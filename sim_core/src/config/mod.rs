//! Configuration loading from TOML and JSON

mod character;
mod constants;
mod encounter;

pub use character::{
    BaseStats, CharacterConfig, Consumable, ConsumablesConfig, GearItem, ResourceConfig, TalentConfig,
};
pub use constants::GameConstants;
pub use encounter::{EncounterConfig, IncomingDamageConfig, TargetConfig};

use crate::apl::RotationConfig;
use crate::aura::AuraConfig;
use crate::bus::ProcConfig;
use crate::spell::{SpellConfig, SpellModConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Unknown {kind} '{name}' referenced by {context}")]
    UnknownReference {
        kind: &'static str,
        name: String,
        context: String,
    },
    #[error("Type error in rotation: {0}")]
    TypeError(String),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub(crate) fn unknown(kind: &'static str, name: &str, context: impl Into<String>) -> Self {
        ConfigError::UnknownReference {
            kind,
            name: name.to_string(),
            context: context.into(),
        }
    }
}

/// Everything the engine needs to simulate one character against one encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub constants: GameConstants,
    pub character: CharacterConfig,
    #[serde(default)]
    pub spells: Vec<SpellConfig>,
    #[serde(default)]
    pub auras: Vec<AuraConfig>,
    #[serde(default)]
    pub procs: Vec<ProcConfig>,
    /// Talent and glyph catalog; the character selects entries by id
    #[serde(default)]
    pub talents: Vec<TalentConfig>,
    /// Permanent spell modifiers applied regardless of talent selection
    #[serde(default)]
    pub spell_mods: Vec<SpellModConfig>,
    pub rotation: RotationConfig,
    pub encounter: EncounterConfig,
}

/// Load a TOML file and deserialize it
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load a TOML string and deserialize it
pub fn parse_toml<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let config: T = toml::from_str(content)?;
    Ok(config)
}

/// Load a JSON string and deserialize it
pub fn parse_json<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let config: T = serde_json::from_str(content)?;
    Ok(config)
}

/// The bundled demo preset: a hardcaster with builders, spenders, a DoT,
/// a cooldown buff and an ignite-style proc
pub fn demo_config() -> Result<SimConfig, ConfigError> {
    parse_toml(include_str!("../../config/presets/demo.toml"))
}

/// Serde adapter: durations written as floating-point seconds
pub mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        to_duration(seconds).map_err(serde::de::Error::custom)
    }

    pub(crate) fn to_duration(seconds: f64) -> Result<Duration, String> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("invalid duration: {} seconds", seconds));
        }
        Ok(Duration::from_secs_f64(seconds))
    }
}

/// Serde adapter: optional durations written as floating-point seconds
pub mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(deserializer)? {
            Some(seconds) => super::secs::to_duration(seconds)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
