//! # Generation Scenario Tests (S1-S5)
//!
//! End-to-end behavior of the generator on small, fully specified inputs.
//! Every test uses the closed-form thermodynamic backend so results do not
//! depend on the host having primer3 installed.
//!
//! ## Tiers
//! - S1: Trivial completion
//! - S2: Seed violations
//! - S3: Extreme but satisfiable constraints
//! - S4: Disabled rules never reach the adapter
//! - S5: Determinism and randomness
//! - S6: Composition and periodicity of long sequences

use seqforge_core::{
    BacktrackingEngine, ConfigOverrides, DeterministicRandom, GenerationMode, Generator,
    GeneratorConfig, ProfileCatalog, RuleSet, Termination, ThermodynamicAdapter, Validator,
    parse_sequence,
};
use std::collections::BTreeSet;

const PRIMER: &str = "CCTGTCATCACGCTAGTAAC";

fn sequence_only() -> GeneratorConfig {
    let catalog = ProfileCatalog::builtin().expect("builtin");
    let overrides = ConfigOverrides {
        progress_logging: Some(false),
        ..Default::default()
    };
    GeneratorConfig::resolve(Some(catalog.get("sequence_only").expect("profile")), &overrides)
        .expect("resolve")
}

fn generator(config: GeneratorConfig) -> Generator {
    Generator::with_adapter(config, ThermodynamicAdapter::fallback())
}

// =============================================================================
// TIER S1: TRIVIAL COMPLETION
// =============================================================================

mod s1_trivial_completion {
    use super::*;

    /// S1.1: A seed already at the target length succeeds without searching.
    #[test]
    fn seed_at_target_succeeds_immediately() {
        for config in [GeneratorConfig::default(), sequence_only()] {
            let result = generator(config).generate("ATGC", 4, None).expect("generate");
            assert!(result.success);
            assert_eq!(result.sequence.as_deref(), Some("ATGC"));
            assert_eq!(result.stats.backtrack_count, 0);
            assert_eq!(result.stats.total_attempts, 0);
        }
    }

    /// S1.2: A primer-sized seed extends to a long target.
    #[test]
    fn primer_extends_to_target() {
        let result = generator(sequence_only())
            .generate(PRIMER, 200, Some(42))
            .expect("generate");
        assert!(result.success, "{:?}", result.error_message);
        let sequence = result.sequence.expect("sequence");
        assert_eq!(sequence.len(), 200);
        assert!(sequence.starts_with(PRIMER));
        assert!(sequence.chars().all(|c| "ATGC".contains(c)));
    }

    /// S1.3: The PCR profile is satisfiable with the closed-form backend.
    #[test]
    fn pcr_profile_with_fallback_backend() {
        let catalog = ProfileCatalog::builtin().expect("builtin");
        let config = GeneratorConfig::resolve(
            Some(catalog.get("pcr_friendly").expect("profile")),
            &ConfigOverrides {
                progress_logging: Some(false),
                max_backtrack_attempts: Some(200_000),
                ..Default::default()
            },
        )
        .expect("resolve");
        let result = generator(config)
            .generate("ATGCGATCCAGTGCATGGAC", 60, Some(3))
            .expect("generate");
        assert!(result.success, "{:?}", result.error_message);
        let rollup = result.stats.window_rollup;
        assert!(rollup.tm_min.is_some_and(|tm| tm >= 50.0));
        assert!(rollup.gc_max.is_some_and(|gc| gc <= 0.60));
    }
}

// =============================================================================
// TIER S2: SEED VIOLATIONS
// =============================================================================

mod s2_seed_violations {
    use super::*;
    use seqforge_core::Rule;

    /// S2.1: A seed with an over-long homopolymer cannot be rescued.
    #[test]
    fn homopolymer_seed_is_exhausted() {
        let mut config = sequence_only();
        config.validation.thresholds.max_homopolymer_length = 4;
        let result = generator(config).generate("CCCCCC", 6, None).expect("generate");
        assert!(!result.success);
        assert_eq!(result.termination, Termination::Exhausted);
        assert_eq!(
            result.stats.rule_failures.get(&Rule::HomopolymerRuns),
            Some(&1)
        );
    }

    /// S2.2: Malformed input is an error, not a failed result.
    #[test]
    fn invalid_input_is_error() {
        let g = generator(sequence_only());
        assert!(g.generate("ATGN", 10, None).is_err());
        assert!(g.generate("ATGC", 2, None).is_err());
        assert!(g.generate("ATGC", 0, None).is_err());
    }
}

// =============================================================================
// TIER S3: EXTREME CONSTRAINTS
// =============================================================================

mod s3_extreme_constraints {
    use super::*;

    /// S3.1: A near-100% GC band is still reachable from a GC-rich seed.
    #[test]
    fn gc_rich_band_is_satisfiable() {
        let mut config = sequence_only();
        config.validation.rules.gc_content = true;
        config.validation.rules.three_prime_stability = false;
        config.validation.thresholds.min_gc = 0.9;
        config.validation.thresholds.max_gc = 1.0;
        config.validation.thresholds.window_size = 10;
        config.validate().expect("valid");

        let result = generator(config)
            .generate("GGCCGGCCGG", 50, Some(17))
            .expect("generate");
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.actual_length, 50);
        let metrics = result.quality_metrics.expect("metrics");
        assert!(metrics.gc_content >= 0.9);
    }

    /// Pattern rules plus a GC band over 10 nt windows, uniform selection.
    fn gc_band(min_gc: f64, max_gc: f64) -> GeneratorConfig {
        let mut config = sequence_only();
        config.validation.rules.gc_content = true;
        config.validation.rules.three_prime_stability = false;
        config.validation.thresholds.min_gc = min_gc;
        config.validation.thresholds.max_gc = max_gc;
        config.validation.thresholds.window_size = 10;
        config.search.heuristics = false;
        config
    }

    /// Rejections plus backtracks summed over `seeds`.
    fn search_effort(
        config: GeneratorConfig,
        initial: &str,
        seeds: std::ops::RangeInclusive<u64>,
    ) -> usize {
        let g = generator(config);
        seeds
            .map(|seed| {
                let result = g.generate(initial, 50, Some(seed)).expect("generate");
                result.stats.rejected + result.stats.backtrack_count
            })
            .sum()
    }

    /// S3.2: A 90-100% GC band costs materially more search than a 40-60% band.
    ///
    /// Effort is rejections plus backtracks. The scorer steers GC into either
    /// band and leaves both at zero, so selection is uniform here. Backtracks
    /// stay at zero under uniform selection too; the cost shows up as
    /// rejected extensions.
    #[test]
    fn gc_rich_band_costs_more_search() {
        let rich = search_effort(gc_band(0.9, 1.0), "GGCCGGCCGG", 1..=20);
        let balanced = search_effort(gc_band(0.4, 0.6), "ATGCGATCCA", 1..=20);
        assert!(rich > 2 * balanced, "rich={rich} balanced={balanced}");
    }

    /// S3.3: The attempt budget bounds an infeasible search.
    #[test]
    fn budget_bounds_search() {
        let mut config = sequence_only();
        config.search.max_backtrack_attempts = 50;
        let result = generator(config).generate(PRIMER, 100, Some(1)).expect("generate");
        assert!(!result.success);
        assert_eq!(result.termination, Termination::BudgetExceeded);
        assert_eq!(result.stats.total_attempts, 51);
        assert!(result.error_message.is_some_and(|m| m.contains("budget")));
    }
}

// =============================================================================
// TIER S4: DISABLED RULES
// =============================================================================

mod s4_disabled_rules {
    use super::*;

    /// S4.1: The search never calls the adapter for disabled thermodynamic rules.
    #[test]
    fn search_skips_adapter() {
        let config = sequence_only();
        assert!(!config.validation.rules.any_thermodynamic());
        let thermo = ThermodynamicAdapter::fallback();

        let outcome = BacktrackingEngine::new(
            &config,
            &thermo,
            parse_sequence(PRIMER).expect("valid"),
            120,
            DeterministicRandom::new(5),
        )
        .run();
        assert_eq!(outcome.termination, Termination::Succeeded);
        assert_eq!(thermo.call_counts().total(), 0);
    }

    /// S4.2: Post-hoc analysis still computes the thermodynamic metrics.
    #[test]
    fn analysis_still_computes() {
        let g = generator(sequence_only());
        let result = g.generate(PRIMER, 80, Some(5)).expect("generate");
        let counts = g.thermo().call_counts();
        assert_eq!((counts.melting, counts.hairpin, counts.homodimer), (1, 1, 1));

        let metrics = result.quality_metrics.expect("metrics");
        assert!(metrics.melting_temperature > 0.0);
        assert!(metrics.is_valid || !metrics.violations.is_empty());
    }

    /// S4.3: With every rule off, any extension is accepted on the first try.
    #[test]
    fn no_rules_never_rejects() {
        let mut config = sequence_only();
        config.validation.rules = RuleSet::none();
        config.search.heuristics = false;
        let result = generator(config).generate("", 64, Some(0)).expect("generate");
        assert!(result.success);
        assert_eq!(result.stats.rejected, 0);
        assert_eq!(result.stats.total_attempts, 64);
    }
}

// =============================================================================
// TIER S5: DETERMINISM AND RANDOMNESS
// =============================================================================

mod s5_determinism {
    use super::*;

    /// S5.1: Same seed, same configuration, identical output and statistics.
    #[test]
    fn deterministic_repeatable() {
        let g = generator(sequence_only());
        let a = g.generate(PRIMER, 150, Some(99)).expect("generate");
        let b = g.generate(PRIMER, 150, Some(99)).expect("generate");
        assert_eq!(a.sequence, b.sequence);
        assert_eq!(a.stats, b.stats);
    }

    /// S5.2: Random mode with different seeds explores different sequences.
    #[test]
    fn random_mode_varies_with_seed() {
        let mut config = sequence_only();
        config.search.mode = GenerationMode::Random;
        let g = generator(config);

        let distinct: BTreeSet<String> = (0..6)
            .filter_map(|seed| g.generate(PRIMER, 80, Some(seed)).expect("generate").sequence)
            .collect();
        assert!(distinct.len() > 1);
    }

    /// S5.3: Random mode without a seed still produces valid sequences.
    #[test]
    fn random_mode_without_seed() {
        let mut config = sequence_only();
        config.search.mode = GenerationMode::Random;
        let g = generator(config);
        let results = g.generate_multiple(PRIMER, 60, 3, None).expect("batch");
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.success);
            let sequence = parse_sequence(result.sequence.as_deref().unwrap_or_default())
                .expect("valid");
            let validator = Validator::new(&g.config().validation, g.thermo());
            assert!(validator.check_window(&sequence[sequence.len() - 20..]).is_acceptable());
        }
    }
}

// =============================================================================
// TIER S6: COMPOSITION
// =============================================================================

mod s6_composition {
    use super::*;

    /// Fraction of positions equal to the symbol `lag` positions later.
    fn self_match_ratio(sequence: &str, lag: usize) -> f64 {
        let bytes = sequence.as_bytes();
        let pairs = bytes.len() - lag;
        let matches = (0..pairs).filter(|&i| bytes[i] == bytes[i + lag]).count();
        matches as f64 / pairs as f64
    }

    fn long_sequence(seed: u64) -> String {
        let result = generator(sequence_only())
            .generate(PRIMER, 600, Some(seed))
            .expect("generate");
        assert!(result.success, "{:?}", result.error_message);
        result.sequence.expect("sequence")
    }

    /// S6.1: A long sequence does not settle into a window-length period.
    #[test]
    fn long_sequence_is_not_periodic() {
        let sequence = long_sequence(2);
        let ratio = self_match_ratio(&sequence, 20);
        assert!(ratio < 0.7, "lag-20 self-match ratio {ratio}");
    }

    /// S6.2: No symbol is starved; A and G each keep at least 5%.
    #[test]
    fn every_symbol_keeps_a_share() {
        for seed in 1..=5 {
            let sequence = long_sequence(seed);
            for symbol in ['A', 'T', 'G', 'C'] {
                let share =
                    sequence.chars().filter(|c| *c == symbol).count() as f64 / sequence.len() as f64;
                assert!(share >= 0.05, "seed {seed}: {symbol} at {share}");
            }
        }
    }
}
