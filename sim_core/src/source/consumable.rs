//! ConsumableSource - Stats from flasks and food

use crate::config::Consumable;
use crate::source::StatSource;
use crate::stat_block::StatAccumulator;

/// Stats from a consumable eaten before the pull
pub struct ConsumableSource<'a> {
    pub consumable: &'a Consumable,
}

impl<'a> ConsumableSource<'a> {
    pub fn new(consumable: &'a Consumable) -> Self {
        ConsumableSource { consumable }
    }
}

impl StatSource for ConsumableSource<'_> {
    fn id(&self) -> &str {
        &self.consumable.name
    }

    fn priority(&self) -> i32 {
        50 // After gear, before talents
    }

    fn apply(&self, stats: &mut StatAccumulator) {
        for modifier in &self.consumable.stats {
            stats.add(modifier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsumablesConfig;
    use crate::types::{StatKind, StatModifier};

    #[test]
    fn test_flask_and_food_apply() {
        let consumables = ConsumablesConfig {
            flask: Some(Consumable {
                name: "Flask of the Warm Sun".to_string(),
                stats: vec![StatModifier::flat(StatKind::Intellect, 1000.0)],
            }),
            food: Some(Consumable {
                name: "Mogu Fish Stew".to_string(),
                stats: vec![StatModifier::flat(StatKind::Intellect, 300.0)],
            }),
        };

        let mut acc = StatAccumulator::new();
        for consumable in consumables.iter() {
            ConsumableSource::new(consumable).apply(&mut acc);
        }
        assert!((acc.get(StatKind::Intellect).unwrap().flat - 1300.0).abs() < 0.01);

        let names: Vec<&str> = consumables.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Flask of the Warm Sun", "Mogu Fish Stew"]);
    }
}
