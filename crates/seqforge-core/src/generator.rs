//! # Generator
//!
//! Public entry point: normalizes input, picks the seed for the random source,
//! runs the engine and computes the final [`QualityMetrics`].
//!
//! ## Seed Policy
//!
//! | Mode | Explicit seed | Configured seed | Neither |
//! |------|---------------|-----------------|---------|
//! | deterministic | used | used | [`derive_seed`] |
//! | random | used | used | process entropy |

use crate::SeqforgeError;
use crate::alphabet::{parse_sequence, to_string};
use crate::config::{GenerationMode, GeneratorConfig};
use crate::engine::{BacktrackingEngine, GenerationStats, Termination};
use crate::random::{DeterministicRandom, derive_seed};
use crate::thermo::{BackendKind, ThermodynamicAdapter};
use crate::validator::{QualityMetrics, Validator};
use serde::Serialize;
use std::time::Instant;

/// Number of failing rules named in a failure message.
const REPORTED_FAILURES: usize = 3;

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    /// The full sequence, seed included. `None` unless `success`.
    pub sequence: Option<String>,
    /// The normalized seed.
    pub initial_sequence: String,
    pub target_length: usize,
    pub actual_length: usize,
    /// Whole-sequence metrics. `None` unless `success`.
    pub quality_metrics: Option<QualityMetrics>,
    pub stats: GenerationStats,
    pub termination: Termination,
    pub mode: GenerationMode,
    /// Seed the random source started from.
    pub seed_used: u64,
    pub thermo_backend: BackendKind,
    /// Wall-clock seconds spent in the search and analysis.
    pub generation_time: f64,
    pub error_message: Option<String>,
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Sequence generator bound to one configuration and one adapter.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    thermo: ThermodynamicAdapter,
}

impl Generator {
    /// Build with a detected thermodynamic backend.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let thermo = ThermodynamicAdapter::detect(config.validation.thermo);
        Self::with_adapter(config, thermo)
    }

    #[must_use]
    pub fn with_adapter(config: GeneratorConfig, thermo: ThermodynamicAdapter) -> Self {
        tracing::debug!(config = %config, backend = %thermo.backend_kind(), "generator ready");
        Self { config, thermo }
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    #[must_use]
    pub fn thermo(&self) -> &ThermodynamicAdapter {
        &self.thermo
    }

    /// Validator over this generator's configuration and adapter.
    #[must_use]
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.config.validation, &self.thermo)
    }

    /// Extend `initial` to `target_length` symbols.
    ///
    /// Malformed input is an `Err`. A search that ends without a sequence is an
    /// `Ok` result with `success == false`.
    pub fn generate(
        &self,
        initial: &str,
        target_length: usize,
        seed: Option<u64>,
    ) -> Result<GenerationResult, SeqforgeError> {
        if target_length == 0 {
            return Err(SeqforgeError::NonPositiveTarget);
        }
        let bases = parse_sequence(initial)?;
        if target_length < bases.len() {
            return Err(SeqforgeError::TargetTooShort {
                target: target_length,
                initial: bases.len(),
            });
        }
        let initial_sequence = to_string(&bases);

        let rng = self.random_source(&initial_sequence, target_length, seed);
        let seed_used = rng.seed();
        tracing::debug!(
            initial = %initial_sequence,
            target_length,
            seed = seed_used,
            mode = %self.config.search.mode,
            "starting generation"
        );

        let start = Instant::now();
        let outcome =
            BacktrackingEngine::new(&self.config, &self.thermo, bases, target_length, rng).run();

        let (sequence, quality_metrics, actual_length) = match &outcome.sequence {
            Some(bases) => (
                Some(to_string(bases)),
                Some(self.validator().analyze_sequence(bases)),
                bases.len(),
            ),
            None => (None, None, 0),
        };
        let generation_time = start.elapsed().as_secs_f64();

        let success = outcome.termination == Termination::Succeeded;
        let error_message = (!success).then(|| failure_message(outcome.termination, &outcome.stats));
        if let Some(message) = &error_message {
            tracing::warn!(%message, "generation failed");
        } else {
            tracing::debug!(
                attempts = outcome.stats.total_attempts,
                backtracks = outcome.stats.backtrack_count,
                seconds = generation_time,
                "generation succeeded"
            );
        }

        Ok(GenerationResult {
            success,
            sequence,
            initial_sequence,
            target_length,
            actual_length,
            quality_metrics,
            stats: outcome.stats,
            termination: outcome.termination,
            mode: self.config.search.mode,
            seed_used,
            thermo_backend: self.thermo.backend_kind(),
            generation_time,
            error_message,
        })
    }

    /// Run `count` generations.
    ///
    /// In random mode an explicit or configured seed is offset by the
    /// iteration index; without one every iteration draws fresh entropy. In
    /// deterministic mode every iteration uses the same seed.
    pub fn generate_multiple(
        &self,
        initial: &str,
        target_length: usize,
        count: usize,
        seed: Option<u64>,
    ) -> Result<Vec<GenerationResult>, SeqforgeError> {
        let base_seed = seed.or(self.config.search.seed);
        let mut results = Vec::with_capacity(count);

        for index in 0..count {
            let iteration_seed = match self.config.search.mode {
                GenerationMode::Random => base_seed.map(|s| s.wrapping_add(index as u64)),
                GenerationMode::Deterministic => base_seed,
            };
            results.push(self.generate(initial, target_length, iteration_seed)?);
        }

        if self.config.search.mode == GenerationMode::Deterministic && results.len() > 1 {
            let identical = results.windows(2).all(|w| w[0].sequence == w[1].sequence);
            tracing::info!(count = results.len(), identical, "deterministic batch complete");
        }
        Ok(results)
    }

    fn random_source(
        &self,
        initial: &str,
        target_length: usize,
        explicit: Option<u64>,
    ) -> DeterministicRandom {
        let chosen = explicit.or(self.config.search.seed);
        match (self.config.search.mode, chosen) {
            (_, Some(seed)) => DeterministicRandom::new(seed),
            (GenerationMode::Deterministic, None) => DeterministicRandom::new(derive_seed(
                initial,
                target_length,
                &self.config.validation,
            )),
            (GenerationMode::Random, None) => DeterministicRandom::unpredictable(),
        }
    }
}

fn failure_message(termination: Termination, stats: &GenerationStats) -> String {
    let reason = match termination {
        Termination::BudgetExceeded => "attempt budget exceeded",
        Termination::Exhausted | Termination::Succeeded => "search space exhausted",
    };
    let failures = stats.most_frequent_failures(REPORTED_FAILURES);
    let detail = if failures.is_empty() {
        "none recorded".to_string()
    } else {
        failures
            .iter()
            .map(|(rule, count)| format!("{rule} ({count})"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Failed to generate sequence: {reason}. Most frequent failures: {detail}. \
         Backtracks: {}, attempts: {}",
        stats.backtrack_count, stats.total_attempts
    )
}

// =============================================================================
// TESTS
// =============================================================================
