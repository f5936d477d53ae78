//! GearSource - Stats from equipped items

use crate::config::GearItem;
use crate::source::StatSource;
use crate::stat_block::StatAccumulator;

/// Stats from an equipped item
pub struct GearSource<'a> {
    pub item: &'a GearItem,
}

impl<'a> GearSource<'a> {
    pub fn new(item: &'a GearItem) -> Self {
        GearSource { item }
    }
}

impl StatSource for GearSource<'_> {
    fn id(&self) -> &str {
        &self.item.name
    }

    fn priority(&self) -> i32 {
        0 // Gear applies at default priority
    }

    fn apply(&self, stats: &mut StatAccumulator) {
        for modifier in &self.item.stats {
            stats.add(modifier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquipmentSlot, ModifierKind, StatKind, StatModifier};

    #[test]
    fn test_gear_apply() {
        let item = GearItem {
            name: "Band of Haste".to_string(),
            slot: EquipmentSlot::Finger1,
            stats: vec![
                StatModifier::flat(StatKind::HasteRating, 300.0),
                StatModifier {
                    stat: StatKind::Intellect,
                    value: 0.05,
                    kind: ModifierKind::Increased,
                },
            ],
            procs: Vec::new(),
        };

        let source = GearSource::new(&item);
        let mut acc = StatAccumulator::new();
        source.apply(&mut acc);

        assert!((acc.get(StatKind::HasteRating).unwrap().flat - 300.0).abs() < 0.01);
        assert!((acc.get(StatKind::Intellect).unwrap().increased - 0.05).abs() < 0.01);
        assert_eq!(source.id(), "Band of Haste");
    }
}
