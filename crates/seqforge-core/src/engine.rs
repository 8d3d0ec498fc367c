//! # Backtracking Engine
//!
//! Grows a seed one symbol at a time. Each position keeps the set of symbols
//! not yet tried there; when a set runs dry the engine steps back one position.
//!
//! ## State Machine
//!
//! ```text
//!              ┌──────────── reject ───────────┐
//!              ▼                               │
//! start ──► Extending ── accept, len == target ─┼──► Succeeded
//!              │  ▲                            │
//!    top set   │  │ set non-empty              │
//!    empty     ▼  │                            │
//!           Backtracking ── stack empty ──────────► Exhausted
//!
//! any step with total_attempts > max_backtrack_attempts ──► BudgetExceeded
//! ```
//!
//! Seed symbols are never removed. A seed that already breaks a
//! position-independent rule ends the search as `Exhausted` before the first
//! step.

use crate::alphabet::{ALPHABET, Base, analysis_window};
use crate::config::GeneratorConfig;
use crate::heuristic::HeuristicScorer;
use crate::primitives::PROGRESS_INTERVAL;
use crate::random::DeterministicRandom;
use crate::thermo::ThermodynamicAdapter;
use crate::validator::{Rule, Validator, WindowVerdict};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// CANDIDATES
// =============================================================================

/// Symbols still untried at one position, as a 4-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateSet(u8);

impl CandidateSet {
    #[must_use]
    pub const fn full() -> Self {
        Self(0b1111)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn contains(self, base: Base) -> bool {
        self.0 & (1 << base.index()) != 0
    }

    pub fn remove(&mut self, base: Base) {
        self.0 &= !(1 << base.index());
    }

    /// Remaining symbols in alphabet order.
    #[must_use]
    pub fn to_vec(self) -> Vec<Base> {
        ALPHABET.into_iter().filter(|b| self.contains(*b)).collect()
    }
}

/// One candidate set per open position, innermost last.
pub type CandidateStack = Vec<CandidateSet>;

// =============================================================================
// STATES & OUTCOMES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Extending,
    Backtracking,
    Succeeded,
    Exhausted,
    BudgetExceeded,
}

impl EngineState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.termination().is_some()
    }

    #[must_use]
    pub fn termination(self) -> Option<Termination> {
        match self {
            Self::Succeeded => Some(Termination::Succeeded),
            Self::Exhausted => Some(Termination::Exhausted),
            Self::BudgetExceeded => Some(Termination::BudgetExceeded),
            Self::Extending | Self::Backtracking => None,
        }
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Succeeded,
    Exhausted,
    BudgetExceeded,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Exhausted => f.write_str("exhausted"),
            Self::BudgetExceeded => f.write_str("budget_exceeded"),
        }
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Range of measurements seen on accepted windows.
///
/// Only quantities the validator actually computed are recorded; a field stays
/// `None` when its rule was disabled throughout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowRollup {
    pub gc_min: Option<f64>,
    pub gc_max: Option<f64>,
    pub tm_min: Option<f64>,
    pub tm_max: Option<f64>,
    pub hairpin_tm_max: Option<f64>,
    pub homodimer_tm_max: Option<f64>,
}

impl WindowRollup {
    pub fn record(&mut self, verdict: &WindowVerdict) {
        if let Some(gc) = verdict.gc {
            self.gc_min = Some(self.gc_min.map_or(gc, |v| v.min(gc)));
            self.gc_max = Some(self.gc_max.map_or(gc, |v| v.max(gc)));
        }
        if let Some(tm) = verdict.tm {
            self.tm_min = Some(self.tm_min.map_or(tm, |v| v.min(tm)));
            self.tm_max = Some(self.tm_max.map_or(tm, |v| v.max(tm)));
        }
        if let Some(h) = verdict.hairpin {
            self.hairpin_tm_max = Some(self.hairpin_tm_max.map_or(h, |v| v.max(h)));
        }
        if let Some(d) = verdict.homodimer {
            self.homodimer_tm_max = Some(self.homodimer_tm_max.map_or(d, |v| v.max(d)));
        }
    }
}

/// Counters for one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Loop iterations, extension attempts and backtrack steps alike.
    pub total_attempts: usize,
    /// Accepted symbols removed again.
    pub backtrack_count: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Longest sequence length seen.
    pub max_depth_reached: usize,
    /// First-failing-rule counts.
    pub rule_failures: BTreeMap<Rule, usize>,
    pub window_rollup: WindowRollup,
}

impl GenerationStats {
    pub fn record_failure(&mut self, rule: Rule) {
        *self.rule_failures.entry(rule).or_insert(0) += 1;
    }

    /// Up to `limit` rules by failure count, most frequent first.
    #[must_use]
    pub fn most_frequent_failures(&self, limit: usize) -> Vec<(Rule, usize)> {
        let mut failures: Vec<(Rule, usize)> = self
            .rule_failures
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(rule, count)| (*rule, *count))
            .collect();
        failures.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        failures.truncate(limit);
        failures
    }
}

/// Result of [`BacktrackingEngine::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub termination: Termination,
    /// Present only on success.
    pub sequence: Option<Vec<Base>>,
    pub stats: GenerationStats,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The search for one generation call.
pub struct BacktrackingEngine<'a> {
    config: &'a GeneratorConfig,
    validator: Validator<'a>,
    scorer: HeuristicScorer<'a>,
    rng: DeterministicRandom,
    state: EngineState,
    sequence: Vec<Base>,
    stack: CandidateStack,
    seed_length: usize,
    target_length: usize,
    stats: GenerationStats,
}

impl<'a> BacktrackingEngine<'a> {
    /// Prepare a search from `seed` towards `target_length`.
    ///
    /// The caller guarantees `seed.len() <= target_length`.
    #[must_use]
    pub fn new(
        config: &'a GeneratorConfig,
        thermo: &'a ThermodynamicAdapter,
        seed: Vec<Base>,
        target_length: usize,
        rng: DeterministicRandom,
    ) -> Self {
        let seed_length = seed.len();
        Self {
            config,
            validator: Validator::new(&config.validation, thermo),
            scorer: HeuristicScorer::new(&config.validation),
            rng,
            state: EngineState::Extending,
            sequence: seed,
            stack: vec![CandidateSet::full()],
            seed_length,
            target_length,
            stats: GenerationStats {
                max_depth_reached: seed_length,
                ..GenerationStats::default()
            },
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn sequence(&self) -> &[Base] {
        &self.sequence
    }

    #[must_use]
    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// Run to a terminal state.
    #[must_use]
    pub fn run(mut self) -> SearchOutcome {
        if let Some(rule) = self.validator.check_seed(&self.sequence) {
            self.stats.record_failure(rule);
            tracing::warn!(rule = %rule, "seed violates a position-independent rule");
            self.state = EngineState::Exhausted;
            return self.finish();
        }

        if self.sequence.len() >= self.target_length {
            self.state = EngineState::Succeeded;
            return self.finish();
        }

        while !self.state.is_terminal() {
            self.step();
        }
        self.finish()
    }

    /// Advance by one loop iteration.
    pub fn step(&mut self) -> EngineState {
        if self.state.is_terminal() {
            return self.state;
        }

        self.stats.total_attempts += 1;
        if self.stats.total_attempts > self.config.search.max_backtrack_attempts {
            tracing::warn!(
                limit = self.config.search.max_backtrack_attempts,
                depth = self.sequence.len(),
                "backtracking attempt limit exceeded"
            );
            self.state = EngineState::BudgetExceeded;
            return self.state;
        }

        let Some(top) = self.stack.last_mut() else {
            tracing::warn!("exhausted all backtracking options");
            self.state = EngineState::Exhausted;
            return self.state;
        };

        if top.is_empty() {
            self.state = EngineState::Backtracking;
            self.stack.pop();
            if self.sequence.len() > self.seed_length {
                self.sequence.pop();
                self.stats.backtrack_count += 1;
            }
            return self.state;
        }

        self.state = EngineState::Extending;
        let options = top.to_vec();
        let Some(candidate) = self.choose(&options) else {
            return self.state;
        };
        if let Some(top) = self.stack.last_mut() {
            top.remove(candidate);
        }

        self.sequence.push(candidate);
        let verdict = self.validator.check_window(analysis_window(
            &self.sequence,
            self.config.validation.thresholds.window_size,
        ));

        match verdict.failed {
            Some(rule) => {
                self.sequence.pop();
                self.stats.rejected += 1;
                self.stats.record_failure(rule);
            }
            None => self.accept(&verdict),
        }
        self.state
    }

    fn choose(&mut self, options: &[Base]) -> Option<Base> {
        if !self.config.search.heuristics || options.len() <= 1 {
            return self.rng.choose(options);
        }
        let scored = self.scorer.rank(options, &self.sequence);
        HeuristicScorer::select_from_scores(&scored, self.config.search.mode, &mut self.rng)
    }

    fn accept(&mut self, verdict: &WindowVerdict) {
        self.stats.accepted += 1;
        self.stats.window_rollup.record(verdict);
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(self.sequence.len());
        self.stack.push(CandidateSet::full());

        let length = self.sequence.len();
        if self.config.search.progress_logging && length % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                length,
                target = self.target_length,
                progress = format!("{:.1}%", length as f64 / self.target_length as f64 * 100.0),
                "generation progress"
            );
        }

        if length >= self.target_length {
            self.state = EngineState::Succeeded;
        }
    }

    fn finish(self) -> SearchOutcome {
        let termination = self.state.termination().unwrap_or(Termination::Exhausted);
        SearchOutcome {
            termination,
            sequence: (termination == Termination::Succeeded).then_some(self.sequence),
            stats: self.stats,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::parse_sequence;
    use crate::config::{RuleSet, ValidationConfig};

    fn sequence_only() -> GeneratorConfig {
        let mut validation = ValidationConfig::default();
        validation.rules = RuleSet {
            gc_content: false,
            melting_temperature: false,
            hairpin_structures: false,
            homodimer_structures: false,
            ..RuleSet::all()
        };
        GeneratorConfig {
            validation,
            ..GeneratorConfig::default()
        }
    }

    fn run(config: &GeneratorConfig, seed: &str, target: usize, rng_seed: u64) -> SearchOutcome {
        let thermo = ThermodynamicAdapter::fallback();
        let engine = BacktrackingEngine::new(
            config,
            &thermo,
            parse_sequence(seed).expect("valid"),
            target,
            DeterministicRandom::new(rng_seed),
        );
        engine.run()
    }

    #[test]
    fn candidate_set_iterates_in_alphabet_order() {
        let mut set = CandidateSet::full();
        assert_eq!(set.len(), 4);
        set.remove(Base::T);
        assert_eq!(set.to_vec(), vec![Base::A, Base::G, Base::C]);
        assert!(!set.contains(Base::T));
        set.remove(Base::A);
        set.remove(Base::G);
        set.remove(Base::C);
        assert!(set.is_empty());
        assert_eq!(set, CandidateSet::empty());
    }

    #[test]
    fn seed_at_target_succeeds_without_attempts() {
        let outcome = run(&GeneratorConfig::default(), "ATGC", 4, 0);
        assert_eq!(outcome.termination, Termination::Succeeded);
        assert_eq!(outcome.stats.total_attempts, 0);
        assert_eq!(outcome.stats.backtrack_count, 0);
        assert_eq!(outcome.sequence.map(|s| s.len()), Some(4));
    }

    #[test]
    fn bad_seed_is_exhausted() {
        let outcome = run(&sequence_only(), "CCCCCC", 6, 0);
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert!(outcome.sequence.is_none());
        assert_eq!(outcome.stats.rule_failures.get(&Rule::HomopolymerRuns), Some(&1));
    }

    #[test]
    fn extends_to_target_and_keeps_prefix() {
        let outcome = run(&sequence_only(), "CCTGTCATCACGCTAGTAAC", 80, 11);
        assert_eq!(outcome.termination, Termination::Succeeded);
        let sequence = outcome.sequence.expect("success");
        assert_eq!(sequence.len(), 80);
        assert_eq!(
            crate::alphabet::to_string(&sequence[..20]),
            "CCTGTCATCACGCTAGTAAC"
        );
        assert_eq!(outcome.stats.max_depth_reached, 80);
        assert_eq!(outcome.stats.accepted, 60 + outcome.stats.backtrack_count);
    }

    #[test]
    fn budget_is_enforced() {
        let mut config = GeneratorConfig::default();
        config.search.max_backtrack_attempts = 5;
        let outcome = run(&config, "ATGCATGCAT", 500, 3);
        assert_eq!(outcome.termination, Termination::BudgetExceeded);
        assert_eq!(outcome.stats.total_attempts, 6);
        assert!(outcome.sequence.is_none());
    }

    #[test]
    fn impossible_constraints_exhaust() {
        // Every five-symbol window after the seed still holds its trailing G.
        let mut config = sequence_only();
        config.validation.rules.gc_content = true;
        config.validation.thresholds.min_gc = 0.0;
        config.validation.thresholds.max_gc = 0.0;
        config.validation.thresholds.window_size = 5;
        let outcome = run(&config, "ATTAG", 12, 9);
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.stats.rule_failures.get(&Rule::GcContent), Some(&4));
        assert_eq!(outcome.stats.backtrack_count, 0);
    }

    #[test]
    fn rollup_tracks_enabled_measurements_only() {
        let mut config = sequence_only();
        config.validation.rules.gc_content = true;
        config.validation.thresholds.min_gc = 0.0;
        config.validation.thresholds.max_gc = 1.0;
        let outcome = run(&config, "ATGC", 40, 5);
        let rollup = outcome.stats.window_rollup;
        assert!(rollup.gc_min.is_some());
        assert!(rollup.gc_min <= rollup.gc_max);
        assert!(rollup.tm_min.is_none());
        assert!(rollup.hairpin_tm_max.is_none());
    }

    #[test]
    fn most_frequent_failures_are_sorted() {
        let mut stats = GenerationStats::default();
        stats.record_failure(Rule::GcContent);
        stats.record_failure(Rule::HomopolymerRuns);
        stats.record_failure(Rule::GcContent);
        assert_eq!(
            stats.most_frequent_failures(5),
            vec![(Rule::GcContent, 2), (Rule::HomopolymerRuns, 1)]
        );
        assert_eq!(stats.most_frequent_failures(1).len(), 1);
    }

    #[test]
    fn step_reports_state() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let mut engine = BacktrackingEngine::new(
            &config,
            &thermo,
            parse_sequence("ATG").expect("valid"),
            10,
            DeterministicRandom::new(1),
        );
        assert_eq!(engine.state(), EngineState::Extending);
        engine.step();
        assert_eq!(engine.stats().total_attempts, 1);
        assert!(engine.sequence().len() >= 3);

        let mut steps = 1;
        while !engine.state().is_terminal() && steps < 1_000 {
            engine.step();
            steps += 1;
        }
        assert_eq!(engine.state(), EngineState::Succeeded);
        assert_eq!(engine.sequence().len(), 10);
        // Terminal states are sticky.
        assert_eq!(engine.step(), EngineState::Succeeded);
        assert_eq!(engine.stats().total_attempts, steps);
    }
}
