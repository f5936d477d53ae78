//! Armor - flat percentage mitigation of physical damage

/// Fraction of physical damage removed by armor
///
/// Uses the level-scaled formula:
/// `Reduction = Armor / (Armor + K)`
///
/// where `K` is the attacker-level armor constant. Unlike hit-size based
/// formulas the reduction does not depend on the damage dealt.
pub fn armor_reduction(armor: f64, constant: f64) -> f64 {
    if armor <= 0.0 || constant <= 0.0 {
        return 0.0;
    }
    (armor / (armor + constant)).clamp(0.0, 1.0)
}

/// Physical damage remaining after armor
pub fn apply_armor(damage: f64, armor: f64, constant: f64) -> f64 {
    if damage <= 0.0 {
        return 0.0;
    }
    damage * (1.0 - armor_reduction(armor, constant))
}

/// Armor needed to reach a target reduction percentage
pub fn armor_needed_for_reduction(constant: f64, target_reduction_percent: f64) -> f64 {
    if target_reduction_percent <= 0.0 {
        return 0.0;
    }
    if target_reduction_percent >= 100.0 {
        return f64::INFINITY;
    }

    // r = a / (a + K)  =>  a = r * K / (1 - r)
    let reduction = target_reduction_percent / 100.0;
    reduction * constant / (1.0 - reduction)
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: f64 = 46257.5;

    #[test]
    fn test_no_armor() {
        assert!((apply_armor(100.0, 0.0, K) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_damage() {
        assert!((apply_armor(0.0, 24835.0, K)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boss_armor() {
        // 24835 / (24835 + 46257.5) = 34.93%
        let reduction = armor_reduction(24835.0, K);
        assert!((reduction - 0.3493).abs() < 0.001);
        let after = apply_armor(1000.0, 24835.0, K);
        assert!((after - 650.7).abs() < 1.0);
    }

    #[test]
    fn test_reduction_is_independent_of_hit_size() {
        let small = 1.0 - apply_armor(100.0, 10000.0, K) / 100.0;
        let large = 1.0 - apply_armor(100000.0, 10000.0, K) / 100000.0;
        assert!((small - large).abs() < 1e-12);
    }

    #[test]
    fn test_armor_needed() {
        let needed = armor_needed_for_reduction(K, 50.0);
        assert!((needed - K).abs() < 0.1);
        assert!((armor_reduction(needed, K) - 0.5).abs() < 1e-9);
    }
}
