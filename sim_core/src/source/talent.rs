//! TalentSource - Stats from selected talents and glyphs

use crate::config::TalentConfig;
use crate::source::StatSource;
use crate::stat_block::StatAccumulator;

/// Stats from the character's talent and glyph selection.
///
/// Only stat contributions are handled here; spell modifiers and procs that
/// talents grant are wired by the registry.
pub struct TalentSource<'a> {
    pub selected: Vec<&'a TalentConfig>,
}

impl<'a> TalentSource<'a> {
    pub fn new(selected: Vec<&'a TalentConfig>) -> Self {
        TalentSource { selected }
    }
}

impl StatSource for TalentSource<'_> {
    fn id(&self) -> &str {
        "talents"
    }

    fn priority(&self) -> i32 {
        100 // Talents apply after gear
    }

    fn apply(&self, stats: &mut StatAccumulator) {
        for talent in &self.selected {
            for modifier in &talent.stats {
                stats.add(modifier);
            }
        }
    }
}
