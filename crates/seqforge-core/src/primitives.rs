//! # Search Primitives
//!
//! Hardcoded constants for the seqforge engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Configurable thresholds live in [`crate::config`]; everything here is part of
//! the algorithm itself.

// =============================================================================
// HEURISTIC PENALTIES
// =============================================================================

/// Cost returned for a candidate that creates an over-long homopolymer run.
///
/// Hard penalties are strictly ordered by severity:
/// `HOMOPOLYMER_PENALTY > THREE_PRIME_PENALTY > DINUCLEOTIDE_PENALTY`.
/// When every candidate fails a hard rule, the least severe violation ranks first.
pub const HOMOPOLYMER_PENALTY: f64 = 1e6;

/// Cost returned for a candidate that overloads the 3' end with G/C.
pub const THREE_PRIME_PENALTY: f64 = 5e5;

/// Cost returned for a candidate that extends a dinucleotide repeat past the limit.
pub const DINUCLEOTIDE_PENALTY: f64 = 2e5;

/// Weight of the per-symbol frequency term in the soft cost.
pub const DIVERSITY_WEIGHT: f64 = 0.05;

/// Weight of one prior occurrence of a trailing k-mer in the soft cost.
pub const NOVELTY_WEIGHT: f64 = 0.01;

/// Trailing k-mer sizes checked by the novelty term.
pub const NOVELTY_KMER_SIZES: [usize; 3] = [3, 4, 5];

/// Minimum length of the recent history searched by the novelty term.
pub const NOVELTY_HISTORY: usize = 100;

// =============================================================================
// SELECTION POLICY
// =============================================================================

/// Scores closer than this to the best are treated as ties.
pub const SCORE_EPSILON: f64 = 1e-9;

/// In random mode, every candidate within this margin of the best is eligible.
pub const RANDOM_MODE_MARGIN: f64 = 0.02;

// =============================================================================
// RULE CONSTANTS
// =============================================================================

/// Number of trailing symbols inspected by the 3' stability rule.
///
/// Windows shorter than this pass the rule.
pub const THREE_PRIME_WINDOW: usize = 5;

/// Smallest accepted `window_size`.
pub const MIN_WINDOW_SIZE: usize = THREE_PRIME_WINDOW;

/// Sequences up to this length use the Wallace rule in the fallback Tm.
pub const WALLACE_MAX_LENGTH: usize = 14;

// =============================================================================
// FALLBACK STRUCTURE HEURISTIC
// =============================================================================

/// Shortest self-complementary stem counted as a structure.
pub const MIN_STEM_PAIRS: usize = 4;

/// Shortest hairpin loop between the two arms of a stem.
pub const MIN_HAIRPIN_LOOP: usize = 3;

/// Estimated degrees contributed by one A·T pair of a stem.
pub const AT_PAIR_DEGREES: f64 = 3.0;

/// Estimated degrees contributed by one G·C pair of a stem.
pub const GC_PAIR_DEGREES: f64 = 5.0;

// =============================================================================
// ENGINE
// =============================================================================

/// Accepted-position interval between progress log lines.
pub const PROGRESS_INTERVAL: usize = 50;

/// Entries kept in the thermodynamic memo cache before it is cleared.
pub const THERMO_CACHE_CAPACITY: usize = 4096;
