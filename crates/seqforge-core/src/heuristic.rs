//! # Heuristic Scorer
//!
//! Ranks candidate symbols for the next position. Lower is better.
//!
//! A candidate that breaks an enabled hard rule gets a fixed penalty:
//!
//! | Rule | Penalty |
//! |------|---------|
//! | homopolymer run | `1e6` |
//! | 3' stability | `5e5` |
//! | dinucleotide repeat | `2e5` |
//!
//! Otherwise the soft cost is the sum of the GC distance to the target, a
//! diversity term and a novelty term that discourages periodic patterns.

use crate::alphabet::{Base, analysis_window, gc_fraction};
use crate::config::{GenerationMode, ValidationConfig};
use crate::primitives::{
    DINUCLEOTIDE_PENALTY, DIVERSITY_WEIGHT, HOMOPOLYMER_PENALTY, NOVELTY_HISTORY,
    NOVELTY_KMER_SIZES, NOVELTY_WEIGHT, RANDOM_MODE_MARGIN, SCORE_EPSILON, THREE_PRIME_PENALTY,
    THREE_PRIME_WINDOW,
};
use crate::random::DeterministicRandom;
use crate::validator::{longest_homopolymer, max_dinucleotide_repeat, three_prime_gc_count};

/// Candidate cost function.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicScorer<'a> {
    config: &'a ValidationConfig,
}

impl<'a> HeuristicScorer<'a> {
    #[must_use]
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Cost of appending `symbol` to `partial`.
    #[must_use]
    pub fn score(&self, symbol: Base, partial: &[Base], target_gc: Option<f64>) -> f64 {
        let rules = &self.config.rules;
        let t = &self.config.thresholds;

        let mut window: Vec<Base> =
            analysis_window(partial, t.window_size.saturating_sub(1)).to_vec();
        window.push(symbol);

        if rules.homopolymer_runs && longest_homopolymer(&window).length > t.max_homopolymer_length
        {
            return HOMOPOLYMER_PENALTY;
        }
        if rules.three_prime_stability
            && window.len() >= THREE_PRIME_WINDOW
            && three_prime_gc_count(&window) > t.max_3prime_gc
        {
            return THREE_PRIME_PENALTY;
        }
        if rules.dinucleotide_repeats
            && max_dinucleotide_repeat(&window).count > t.max_dinucleotide_repeats
        {
            return DINUCLEOTIDE_PENALTY;
        }

        let distance = target_gc.map_or(0.0, |target| (gc_fraction(&window) - target).abs());

        let frequency =
            window.iter().filter(|b| **b == symbol).count() as f64 / window.len() as f64;

        let history = analysis_window(partial, NOVELTY_HISTORY.max(t.window_size));
        let novelty: f64 = NOVELTY_KMER_SIZES
            .iter()
            .filter(|k| partial.len() + 1 >= **k)
            .map(|&k| {
                let mut kmer = partial[partial.len() + 1 - k..].to_vec();
                kmer.push(symbol);
                NOVELTY_WEIGHT * count_non_overlapping(history, &kmer) as f64
            })
            .sum();

        distance + DIVERSITY_WEIGHT * frequency + novelty
    }

    /// Score every option and sort ascending. Equal scores keep input order.
    #[must_use]
    pub fn rank(&self, options: &[Base], partial: &[Base]) -> Vec<(Base, f64)> {
        let target_gc = self.config.target_gc();
        let mut scored: Vec<(Base, f64)> = options
            .iter()
            .map(|&base| (base, self.score(base, partial, target_gc)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored
    }

    /// Pick from a ranked list.
    ///
    /// Random mode draws among everything within [`RANDOM_MODE_MARGIN`] of the
    /// best. Otherwise, or if only one candidate is that close, exact ties
    /// (within [`SCORE_EPSILON`]) are broken by `rng`.
    pub fn select_from_scores(
        scored: &[(Base, f64)],
        mode: GenerationMode,
        rng: &mut DeterministicRandom,
    ) -> Option<Base> {
        let (first, best) = *scored.first()?;

        if mode == GenerationMode::Random {
            let eligible: Vec<Base> = scored
                .iter()
                .filter(|(_, s)| *s <= best + RANDOM_MODE_MARGIN)
                .map(|(b, _)| *b)
                .collect();
            if eligible.len() > 1 {
                return rng.choose(&eligible);
            }
        }

        let ties: Vec<Base> = scored
            .iter()
            .filter(|(_, s)| (*s - best).abs() < SCORE_EPSILON)
            .map(|(b, _)| *b)
            .collect();
        if ties.len() > 1 {
            return rng.choose(&ties);
        }
        Some(first)
    }
}

/// Left-to-right count of non-overlapping occurrences.
fn count_non_overlapping(haystack: &[Base], needle: &[Base]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()] == *needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}
