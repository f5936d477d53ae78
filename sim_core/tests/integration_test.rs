//! Integration test: Load config -> Build registry -> Run trials -> Aggregate
//!
//! These tests drive the simulator only through its public API.

use sim_core::{
    aggregate::{run_simulation_with_cancel, CancelToken, Convergence, SimOptions},
    config::{demo_config, parse_json, parse_toml, SimConfig},
    registry::Registry,
    run_simulation, run_single_trial,
    trial::run_trial,
    TrialMetrics,
};
use std::time::Duration;

/// Helper to print a separator
fn separator(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}\n", "=".repeat(60));
}

/// Helper to print one trial's breakdown
fn print_metrics(metrics: &TrialMetrics) {
    println!("  Duration: {:.1}s", metrics.duration.as_secs_f64());
    println!("  DPS: {:.0}  HPS: {:.0}  DTPS: {:.0}", metrics.dps(), metrics.hps(), metrics.dtps());
    for (name, spell) in &metrics.spells {
        println!(
            "    {:<20} casts {:>3}  hits {:>3}  crits {:>3}  ticks {:>3}  damage {:>10.0}",
            name, spell.casts, spell.hits, spell.crits, spell.ticks, spell.damage
        );
    }
}

fn fixed_damage(extra_character: &str, extra_spell: &str, encounter: &str) -> SimConfig {
    let toml = format!(
        r#"
[character]
name = "Fixed"
{extra_character}

[[spells]]
id = "strike"
school = "fire"
can_crit = false
formula = {{ min = 1000.0, scales_with = "none" }}
{extra_spell}

[rotation]
rules = [{{ action = {{ type = "cast", spell = "strike" }} }}]

{encounter}
"#
    );
    parse_toml(&toml).unwrap()
}

#[test]
fn test_demo_full_flow() {
    separator("Demo preset, single trial");
    let config = demo_config().unwrap();
    let outcome = run_single_trial(&config, 42).unwrap();
    print_metrics(&outcome.metrics);

    let metrics = &outcome.metrics;
    assert!(metrics.total_damage > 0.0);
    assert!(metrics.damage_taken > 0.0);
    assert!(metrics.total_healing > 0.0);
    assert!(metrics.duration >= Duration::from_secs(270));
    assert!(metrics.duration <= Duration::from_secs(330));
    assert!(metrics.spells["Immolate"].ticks > 0);
    assert!(metrics.procs.contains_key("chaos_bolt_ignite"));
    // Once before the pull, once in the last 25 seconds
    assert_eq!(metrics.spells["Volcanic Potion"].casts, 2);

    let log = outcome.log.unwrap();
    assert!(log[0].message.starts_with("precasts Volcanic Potion"));
    assert_eq!(log[0].time, Duration::ZERO);
}

#[test]
fn test_every_rotation_rule_executes() {
    let config = demo_config().unwrap();
    let outcome = run_single_trial(&config, 7).unwrap();
    for spell in ["Dark Soul", "Immolate", "Conflagrate", "Chaos Bolt", "Mortal Coil", "Incinerate", "Volcanic Potion"] {
        let casts = outcome.metrics.spells.get(spell).map(|s| s.casts).unwrap_or(0);
        assert!(casts > 0, "{} was never cast", spell);
    }
}

#[test]
fn test_same_seed_same_trial() {
    let config = demo_config().unwrap();
    let a = run_single_trial(&config, 1234).unwrap();
    let b = run_single_trial(&config, 1234).unwrap();
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.log, b.log);

    let c = run_single_trial(&config, 1235).unwrap();
    assert_ne!(a.metrics.total_damage, c.metrics.total_damage);
}

#[test]
fn test_fixed_damage_scenario() {
    let config = fixed_damage("", "", "[encounter]\nduration = 60.0");
    let outcome = run_single_trial(&config, 5).unwrap();
    // floor(60 / 1.5) casts of 1000
    assert_eq!(outcome.metrics.casts, 40);
    assert!((outcome.metrics.total_damage - 40_000.0).abs() < 1e-6);
}

#[test]
fn test_haste_cannot_push_gcd_below_floor() {
    let character = "[[character.gear]]\nname = \"Quickening Band\"\nslot = \"finger1\"\nstats = [{ stat = \"haste_rating\", value = 42500.0 }]";
    let config = fixed_damage(character, "", "[encounter]\nduration = 60.0");
    let outcome = run_single_trial(&config, 5).unwrap();
    // 100% haste halves the GCD to 0.75s, clamped to 1.0s
    assert_eq!(outcome.metrics.casts, 60);
}

#[test]
fn test_self_inflicted_slow_stretches_the_gcd() {
    let slow = "applies_aura = { aura = \"slow\", on = \"player\" }\n\n[[auras]]\nid = \"slow\"\nmodifiers = [{ type = \"haste\", percent = -95.0 }]";
    let config = fixed_damage("", slow, "[encounter]\nduration = 60.0");
    let outcome = run_single_trial(&config, 1).unwrap();
    // 0.0 and 1.5 at full speed, then a 30s GCD
    assert_eq!(outcome.metrics.casts, 3);
}

#[test]
fn test_aoe_hits_every_target() {
    let config = fixed_damage("", "aoe = true", "[encounter]\nduration = 60.0\ntarget_count = 3");
    let outcome = run_single_trial(&config, 5).unwrap();
    assert_eq!(outcome.metrics.casts, 40);
    assert_eq!(outcome.metrics.spells["strike"].hits, 120);
    assert!((outcome.metrics.total_damage - 120_000.0).abs() < 1e-6);
}

#[test]
fn test_incoming_damage_and_overhealing() {
    let toml = r#"
[character]
name = "Healer"

[[spells]]
id = "mend"
effect = "heal"
cooldown = 10.0
can_crit = false
formula = { min = 5000.0, scales_with = "none" }

[[spells]]
id = "strike"
formula = { min = 100.0, scales_with = "none" }

[rotation]
rules = [
    { action = { type = "cast", spell = "mend" } },
    { action = { type = "cast", spell = "strike" } },
]

[encounter]
duration = 60.0

[encounter.incoming_damage]
amount = 1000.0
interval = 2.0
school = "shadow"
"#;
    let config: SimConfig = parse_toml(toml).unwrap();
    let metrics = run_single_trial(&config, 3).unwrap().metrics;

    // Hits at 2, 4, ... 58; the encounter ends before the one at 60
    assert!((metrics.damage_taken - 29_000.0).abs() < 1e-6);
    let heals = metrics.spells["mend"].casts as f64;
    assert!((metrics.total_healing + metrics.overhealing - heals * 5000.0).abs() < 1e-6);
    assert!(metrics.total_healing <= metrics.damage_taken);
    assert!(metrics.overhealing > 0.0);
}

#[test]
fn test_json_config() {
    let json = r#"{
        "character": { "name": "Json" },
        "spells": [{ "id": "strike", "can_crit": false, "formula": { "min": 500.0, "scales_with": "none" } }],
        "rotation": { "rules": [{ "action": { "type": "cast", "spell": "strike" } }] },
        "encounter": { "duration": 15.0 }
    }"#;
    let config: SimConfig = parse_json(json).unwrap();
    let registry = Registry::build(&config).unwrap();
    let outcome = run_trial(&registry, 1, false).unwrap();
    assert_eq!(outcome.metrics.casts, 10);
}

#[test]
fn test_aggregate_demo() {
    separator("Demo preset, aggregated");
    let config = demo_config().unwrap();
    let options = SimOptions {
        iterations: 200,
        seed: 99,
        batch_size: 50,
        ..Default::default()
    };
    let result = run_simulation_with_cancel(&config, &options, &CancelToken::new()).unwrap();
    println!(
        "  DPS {:.0} ± {:.1} (95% {:.0}..{:.0})",
        result.dps.mean, result.dps.std_err, result.dps.ci_low, result.dps.ci_high
    );

    assert_eq!(result.iterations, 200);
    assert!(result.failures.is_empty());
    assert_eq!(result.convergence, Convergence::NotRequested);
    assert!(result.dps.std_err > 0.0);
    assert!(result.dps.ci_low < result.dps.mean && result.dps.mean < result.dps.ci_high);
    assert!(result.dps.min <= result.dps.mean && result.dps.mean <= result.dps.max);
    let share: f64 = result.spells.values().map(|s| s.damage_share).sum();
    assert!((share - 1.0).abs() < 1e-6);
}

#[test]
fn test_standard_error_shrinks_with_trials() {
    let config = demo_config().unwrap();
    let run = |iterations| {
        let options = SimOptions {
            iterations,
            seed: 17,
            ..Default::default()
        };
        run_simulation_with_cancel(&config, &options, &CancelToken::new()).unwrap()
    };
    let small = run(40);
    let large = run(640);
    assert!(large.dps.std_err < small.dps.std_err);
}

#[test]
fn test_converges_under_threshold() {
    let config = demo_config().unwrap();
    let options = SimOptions {
        iterations: 5000,
        seed: 5,
        batch_size: 100,
        confidence_threshold: Some(0.01),
        ..Default::default()
    };
    let result = run_simulation_with_cancel(&config, &options, &CancelToken::new()).unwrap();
    assert_eq!(result.convergence, Convergence::Converged);
    assert!(result.iterations < 5000);
    let half_width = result.dps.ci_high - result.dps.mean;
    assert!(half_width / result.dps.mean <= 0.01);
}

#[test]
fn test_cancelled_run_reports_partial_results() {
    let config = demo_config().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = run_simulation_with_cancel(&config, &SimOptions::default(), &cancel).unwrap();
    assert!(result.cancelled);
    assert_eq!(result.iterations, 0);
}

#[test]
fn test_stuck_trials_are_reported_not_fatal() {
    let config = fixed_damage("", "on_gcd = false", "[encounter]\nduration = 30.0");
    let options = SimOptions {
        iterations: 4,
        seed: 8,
        ..Default::default()
    };
    let result = run_simulation_with_cancel(&config, &options, &CancelToken::new()).unwrap();
    assert_eq!(result.iterations, 0);
    assert_eq!(result.failures.len(), 4);
    for failure in &result.failures {
        assert_eq!(failure.action, "decide");
        assert_eq!(failure.actor, "Fixed");
        assert_eq!(failure.time, Duration::ZERO);
    }
}

#[test]
fn test_invalid_config_fails_before_any_trial() {
    let mut config = demo_config().unwrap();
    config.spells.retain(|s| s.id != "incinerate");
    let err = run_simulation(&config, 10).unwrap_err();
    assert!(err.is_config());
}
