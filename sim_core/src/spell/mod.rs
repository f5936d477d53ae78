//! Spells - templates, outcome tables and cast results

mod outcome;
mod result;
mod types;

pub use outcome::{final_amount, MagnitudeInputs, OutcomeTable};
pub use result::{Attempt, RejectReason, SpellResult};
pub use types::{
    AuraApplicationConfig, EffectKind, Formula, OutcomeTableKind, ScalingStat, Spell, SpellConfig,
    SpellModConfig, SpellModKind, StaticMods,
};
