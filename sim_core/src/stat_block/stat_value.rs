//! StatValue - The triple modifier container (Flat → Increased → More)

use crate::types::ModifierKind;
use serde::{Deserialize, Serialize};

/// Represents a stat that follows the Flat → Increased → More model
///
/// Final value is calculated as:
/// `(base + flat) × (1 + increased) × Π(1 + more)`
///
/// - `base`: The character's naked value
/// - `flat`: Sum of all flat additions (gear ratings, enchants)
/// - `increased`: Sum of all increased% (as decimal, e.g., 0.05 = 5%)
/// - `more`: List of more% multipliers (as decimal, each multiplies the result)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub base: f64,
    pub flat: f64,
    pub increased: f64,
    pub more: Vec<f64>,
}

impl StatValue {
    /// Create a new StatValue with the given base
    pub fn with_base(base: f64) -> Self {
        StatValue {
            base,
            flat: 0.0,
            increased: 0.0,
            more: Vec::new(),
        }
    }

    /// Calculate final value: (base + flat) × (1 + increased) × Π(1 + more)
    pub fn compute(&self) -> f64 {
        self.total_flat() * self.total_increased_multiplier() * self.total_more_multiplier()
    }

    /// Add a contribution of the given kind
    pub fn add(&mut self, kind: ModifierKind, value: f64) {
        match kind {
            ModifierKind::Flat => self.add_flat(value),
            ModifierKind::Increased => self.add_increased(value),
            ModifierKind::More => self.add_more(value),
        }
    }

    pub fn add_flat(&mut self, value: f64) {
        self.flat += value;
    }

    /// Add an increased% bonus (as decimal, e.g., 0.05 for 5%)
    pub fn add_increased(&mut self, value: f64) {
        self.increased += value;
    }

    /// Add a more% multiplier (as decimal, e.g., 0.10 for 10% more)
    pub fn add_more(&mut self, value: f64) {
        self.more.push(value);
    }

    /// Fold another container's contributions into this one
    pub fn merge(&mut self, other: &StatValue) {
        self.base += other.base;
        self.flat += other.flat;
        self.increased += other.increased;
        self.more.extend_from_slice(&other.more);
    }

    /// Get the total flat value (base + flat additions)
    pub fn total_flat(&self) -> f64 {
        self.base + self.flat
    }

    /// Get the total increased multiplier (1 + sum of increased%)
    pub fn total_increased_multiplier(&self) -> f64 {
        1.0 + self.increased
    }

    /// Get the total more multiplier (product of all more multipliers)
    pub fn total_more_multiplier(&self) -> f64 {
        self.more.iter().map(|m| 1.0 + m).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_basic() {
        let stat = StatValue::with_base(1200.0);
        assert!((stat.compute() - 1200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compute_full_formula() {
        // Intellect: 1000 base + 500 from gear, 5% from a talent, 10% more from a flask
        // = 1500 × 1.05 × 1.10
        let mut stat = StatValue::with_base(1000.0);
        stat.add(ModifierKind::Flat, 500.0);
        stat.add(ModifierKind::Increased, 0.05);
        stat.add(ModifierKind::More, 0.10);

        let expected = 1500.0 * 1.05 * 1.10;
        assert!((stat.compute() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_increased_stack_additively() {
        let mut stat = StatValue::with_base(100.0);
        stat.add_increased(0.20);
        stat.add_increased(0.30);
        assert!((stat.compute() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_more_stack_multiplicatively() {
        let mut stat = StatValue::with_base(100.0);
        stat.add_more(0.20);
        stat.add_more(0.30);
        assert!((stat.compute() - 156.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = StatValue::with_base(10.0);
        a.add_more(0.5);
        let mut b = StatValue::default();
        b.add_flat(5.0);
        b.add_increased(1.0);
        a.merge(&b);
        // (10 + 5) × 2 × 1.5
        assert!((a.compute() - 45.0).abs() < 1e-9);
    }
}
