//! # Window Validator
//!
//! Decides whether a candidate window satisfies the enabled quality rules, and
//! computes post-hoc [`QualityMetrics`] for whole sequences.
//!
//! ## Evaluation Order
//!
//! ```text
//! homopolymer → dinucleotide → 3' stability → GC → Tm → hairpin → homodimer
//! ```
//!
//! Sequence-only rules run first so the thermodynamic adapter is only reached
//! by windows that already pass the cheap checks. The first failure
//! short-circuits; a disabled rule passes.

use crate::alphabet::{Base, gc_count, gc_fraction, to_string};
use crate::config::ValidationConfig;
use crate::engine::GenerationStats;
use crate::primitives::THREE_PRIME_WINDOW;
use crate::thermo::ThermodynamicAdapter;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// RULES
// =============================================================================

/// One quality rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    HomopolymerRuns,
    DinucleotideRepeats,
    ThreePrimeStability,
    GcContent,
    MeltingTemperature,
    HairpinStructures,
    HomodimerStructures,
}

impl Rule {
    /// All rules, cheapest first.
    pub const EVALUATION_ORDER: [Rule; 7] = [
        Rule::HomopolymerRuns,
        Rule::DinucleotideRepeats,
        Rule::ThreePrimeStability,
        Rule::GcContent,
        Rule::MeltingTemperature,
        Rule::HairpinStructures,
        Rule::HomodimerStructures,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HomopolymerRuns => "homopolymer_runs",
            Self::DinucleotideRepeats => "dinucleotide_repeats",
            Self::ThreePrimeStability => "three_prime_stability",
            Self::GcContent => "gc_content",
            Self::MeltingTemperature => "melting_temperature",
            Self::HairpinStructures => "hairpin_structures",
            Self::HomodimerStructures => "homodimer_structures",
        }
    }

    /// True for rules answered by the thermodynamic adapter.
    #[must_use]
    pub fn is_thermodynamic(&self) -> bool {
        matches!(
            self,
            Self::MeltingTemperature | Self::HairpinStructures | Self::HomodimerStructures
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PATTERN MEASUREMENTS
// =============================================================================

/// Longest run of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HomopolymerRun {
    /// `None` for an empty sequence.
    pub base: Option<Base>,
    pub length: usize,
}

impl fmt::Display for HomopolymerRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Some(base) => write!(f, "{base}x{}", self.length),
            None => f.write_str("-"),
        }
    }
}

/// Most consecutive copies of one heterodimer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DinucleotideRepeat {
    /// `None` when the sequence holds no heterodimer pair.
    pub pair: Option<[Base; 2]>,
    pub count: usize,
}

impl fmt::Display for DinucleotideRepeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pair {
            Some([first, second]) => write!(f, "{first}{second}x{}", self.count),
            None => f.write_str("-"),
        }
    }
}

/// Longest single-symbol run; the first one wins ties.
#[must_use]
pub fn longest_homopolymer(bases: &[Base]) -> HomopolymerRun {
    let mut best = HomopolymerRun::default();
    let mut start = 0;
    while start < bases.len() {
        let base = bases[start];
        let length = bases[start..].iter().take_while(|b| **b == base).count();
        if length > best.length {
            best = HomopolymerRun {
                base: Some(base),
                length,
            };
        }
        start += length;
    }
    best
}

/// Most consecutive copies of a two-symbol unit with distinct symbols.
///
/// `ATATAT` is three copies of `AT`. `AA` pairs are ignored; they belong to
/// the homopolymer rule.
#[must_use]
pub fn max_dinucleotide_repeat(bases: &[Base]) -> DinucleotideRepeat {
    let mut best = DinucleotideRepeat::default();
    for start in 0..bases.len().saturating_sub(1) {
        let (first, second) = (bases[start], bases[start + 1]);
        if first == second {
            continue;
        }
        let mut count = 1;
        while start + 2 * count + 1 < bases.len()
            && bases[start + 2 * count] == first
            && bases[start + 2 * count + 1] == second
        {
            count += 1;
        }
        if count > best.count {
            best = DinucleotideRepeat {
                pair: Some([first, second]),
                count,
            };
        }
    }
    best
}

/// G/C symbols among the last five (or fewer, for short input).
#[must_use]
pub fn three_prime_gc_count(bases: &[Base]) -> usize {
    gc_count(&bases[bases.len().saturating_sub(THREE_PRIME_WINDOW)..])
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of checking one window, with the measurements taken on the way.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowVerdict {
    /// First enabled rule that failed.
    pub failed: Option<Rule>,
    pub gc: Option<f64>,
    pub tm: Option<f64>,
    pub hairpin: Option<f64>,
    pub homodimer: Option<f64>,
}

impl WindowVerdict {
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.failed.is_none()
    }
}

/// Full-sequence quality report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub length: usize,
    pub gc_content: f64,
    pub melting_temperature: f64,
    pub hairpin_tm: f64,
    pub homodimer_tm: f64,
    pub longest_homopolymer: HomopolymerRun,
    pub has_homopolymers: bool,
    pub max_dinucleotide_repeat: DinucleotideRepeat,
    pub has_dinucleotide_repeats: bool,
    pub three_prime_gc_count: usize,
    pub three_prime_stable: bool,
    /// Enabled rules the sequence violates, in evaluation order.
    pub violations: Vec<Rule>,
    /// True when `violations` is empty.
    pub is_valid: bool,
}

/// Metrics of one sliding window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    /// Zero-based start offset.
    pub window_start: usize,
    /// Exclusive end offset.
    pub window_end: usize,
    pub sequence: String,
    pub metrics: QualityMetrics,
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Rule checks bound to one configuration and one adapter.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    config: &'a ValidationConfig,
    thermo: &'a ThermodynamicAdapter,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(config: &'a ValidationConfig, thermo: &'a ThermodynamicAdapter) -> Self {
        Self { config, thermo }
    }

    #[must_use]
    pub fn config(&self) -> &'a ValidationConfig {
        self.config
    }

    // -------------------------------------------------------------------------
    // Per-rule checks (ignore the enable flags)
    // -------------------------------------------------------------------------

    /// No run longer than `max_homopolymer_length`.
    #[must_use]
    pub fn check_homopolymer(&self, window: &[Base]) -> bool {
        longest_homopolymer(window).length <= self.config.thresholds.max_homopolymer_length
    }

    /// No heterodimer repeated more than `max_dinucleotide_repeats` times.
    #[must_use]
    pub fn check_dinucleotide(&self, window: &[Base]) -> bool {
        max_dinucleotide_repeat(window).count <= self.config.thresholds.max_dinucleotide_repeats
    }

    /// At most `max_3prime_gc` G/C among the last five symbols.
    #[must_use]
    pub fn check_three_prime(&self, window: &[Base]) -> bool {
        window.len() < THREE_PRIME_WINDOW
            || three_prime_gc_count(window) <= self.config.thresholds.max_3prime_gc
    }

    #[must_use]
    pub fn check_gc(&self, window: &[Base]) -> bool {
        self.gc_in_range(gc_fraction(window))
    }

    #[must_use]
    pub fn check_tm(&self, window: &[Base]) -> bool {
        self.tm_in_range(self.thermo.melting_temperature(window))
    }

    #[must_use]
    pub fn check_hairpin(&self, window: &[Base]) -> bool {
        self.thermo.hairpin_temperature(window) <= self.config.thresholds.max_hairpin_tm
    }

    #[must_use]
    pub fn check_homodimer(&self, window: &[Base]) -> bool {
        self.thermo.homodimer_temperature(window) <= self.config.thresholds.max_homodimer_tm
    }

    fn gc_in_range(&self, gc: f64) -> bool {
        let t = &self.config.thresholds;
        (t.min_gc..=t.max_gc).contains(&gc)
    }

    fn tm_in_range(&self, tm: f64) -> bool {
        let t = &self.config.thresholds;
        (t.min_tm..=t.max_tm).contains(&tm)
    }

    // -------------------------------------------------------------------------
    // Window checks
    // -------------------------------------------------------------------------

    /// Run the enabled rules in order and stop at the first failure.
    #[must_use]
    pub fn check_window(&self, window: &[Base]) -> WindowVerdict {
        let rules = &self.config.rules;
        let t = &self.config.thresholds;
        let mut verdict = WindowVerdict::default();

        if rules.homopolymer_runs && !self.check_homopolymer(window) {
            verdict.failed = Some(Rule::HomopolymerRuns);
            return verdict;
        }
        if rules.dinucleotide_repeats && !self.check_dinucleotide(window) {
            verdict.failed = Some(Rule::DinucleotideRepeats);
            return verdict;
        }
        if rules.three_prime_stability && !self.check_three_prime(window) {
            verdict.failed = Some(Rule::ThreePrimeStability);
            return verdict;
        }

        if rules.gc_content {
            let gc = gc_fraction(window);
            verdict.gc = Some(gc);
            if !self.gc_in_range(gc) {
                verdict.failed = Some(Rule::GcContent);
                return verdict;
            }
        }
        if rules.melting_temperature {
            let tm = self.thermo.melting_temperature(window);
            verdict.tm = Some(tm);
            if !self.tm_in_range(tm) {
                verdict.failed = Some(Rule::MeltingTemperature);
                return verdict;
            }
        }
        if rules.hairpin_structures {
            let hairpin = self.thermo.hairpin_temperature(window);
            verdict.hairpin = Some(hairpin);
            if hairpin > t.max_hairpin_tm {
                verdict.failed = Some(Rule::HairpinStructures);
                return verdict;
            }
        }
        if rules.homodimer_structures {
            let homodimer = self.thermo.homodimer_temperature(window);
            verdict.homodimer = Some(homodimer);
            if homodimer > t.max_homodimer_tm {
                verdict.failed = Some(Rule::HomodimerStructures);
            }
        }
        verdict
    }

    /// True when every enabled rule passes; a failure is counted in `stats`.
    pub fn is_window_acceptable(
        &self,
        window: &[Base],
        stats: Option<&mut GenerationStats>,
    ) -> bool {
        let verdict = self.check_window(window);
        if let (Some(rule), Some(stats)) = (verdict.failed, stats) {
            stats.record_failure(rule);
        }
        verdict.is_acceptable()
    }

    /// Check every trailing window of the seed against the rules that do not
    /// depend on where the window ends: homopolymer runs and dinucleotide
    /// repeats.
    #[must_use]
    pub fn check_seed(&self, seed: &[Base]) -> Option<Rule> {
        let rules = &self.config.rules;
        let window_size = self.config.thresholds.window_size;
        (1..=seed.len()).find_map(|end| {
            let window = &seed[end.saturating_sub(window_size)..end];
            if rules.homopolymer_runs && !self.check_homopolymer(window) {
                Some(Rule::HomopolymerRuns)
            } else if rules.dinucleotide_repeats && !self.check_dinucleotide(window) {
                Some(Rule::DinucleotideRepeats)
            } else {
                None
            }
        })
    }

    // -------------------------------------------------------------------------
    // Analysis
    // -------------------------------------------------------------------------

    /// Compute every metric over the whole sequence.
    ///
    /// Metrics are computed regardless of enable flags; `is_valid` only
    /// considers enabled rules.
    #[must_use]
    pub fn analyze_sequence(&self, sequence: &[Base]) -> QualityMetrics {
        let t = &self.config.thresholds;
        let rules = &self.config.rules;

        let gc_content = gc_fraction(sequence);
        let melting_temperature = self.thermo.melting_temperature(sequence);
        let hairpin_tm = self.thermo.hairpin_temperature(sequence);
        let homodimer_tm = self.thermo.homodimer_temperature(sequence);
        let longest = longest_homopolymer(sequence);
        let dinucleotide = max_dinucleotide_repeat(sequence);
        let three_prime = three_prime_gc_count(sequence);

        let has_homopolymers = longest.length > t.max_homopolymer_length;
        let has_dinucleotide_repeats = dinucleotide.count > t.max_dinucleotide_repeats;
        let three_prime_stable = self.check_three_prime(sequence);

        let violations: Vec<Rule> = rules
            .enabled()
            .filter(|rule| match rule {
                Rule::HomopolymerRuns => has_homopolymers,
                Rule::DinucleotideRepeats => has_dinucleotide_repeats,
                Rule::ThreePrimeStability => !three_prime_stable,
                Rule::GcContent => !self.gc_in_range(gc_content),
                Rule::MeltingTemperature => !self.tm_in_range(melting_temperature),
                Rule::HairpinStructures => hairpin_tm > t.max_hairpin_tm,
                Rule::HomodimerStructures => homodimer_tm > t.max_homodimer_tm,
            })
            .collect();

        QualityMetrics {
            length: sequence.len(),
            gc_content,
            melting_temperature,
            hairpin_tm,
            homodimer_tm,
            longest_homopolymer: longest,
            has_homopolymers,
            max_dinucleotide_repeat: dinucleotide,
            has_dinucleotide_repeats,
            three_prime_gc_count: three_prime,
            three_prime_stable,
            is_valid: violations.is_empty(),
            violations,
        }
    }

    /// Analyze every `window_size` slice, step one.
    ///
    /// Empty when the sequence is shorter than one window.
    #[must_use]
    pub fn scan_windows(&self, sequence: &[Base]) -> Vec<WindowReport> {
        let size = self.config.thresholds.window_size;
        sequence
            .windows(size)
            .enumerate()
            .map(|(start, window)| WindowReport {
                window_start: start,
                window_end: start + size,
                sequence: to_string(window),
                metrics: self.analyze_sequence(window),
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::parse_sequence;
    use crate::config::RuleSet;

    fn bases(text: &str) -> Vec<Base> {
        parse_sequence(text).expect("valid")
    }

    fn sequence_only() -> ValidationConfig {
        let mut config = ValidationConfig::default();
        config.rules.gc_content = false;
        config.rules.melting_temperature = false;
        config.rules.hairpin_structures = false;
        config.rules.homodimer_structures = false;
        config
    }

    #[test]
    fn homopolymer_run_is_measured() {
        let run = longest_homopolymer(&bases("ATTTGCCCCA"));
        assert_eq!(run.base, Some(Base::C));
        assert_eq!(run.length, 4);
        assert_eq!(longest_homopolymer(&[]).length, 0);
    }

    #[test]
    fn dinucleotide_counts_heterodimers_only() {
        assert_eq!(max_dinucleotide_repeat(&bases("ATAT")).count, 2);
        assert_eq!(max_dinucleotide_repeat(&bases("GATATATC")).count, 3);
        let homo = max_dinucleotide_repeat(&bases("AAAAAA"));
        assert_eq!(homo.count, 0);
        assert!(homo.pair.is_none());
    }

    #[test]
    fn dinucleotide_limit_is_inclusive() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);
        assert!(validator.check_dinucleotide(&bases("ATAT")));
        assert!(!validator.check_dinucleotide(&bases("ATATAT")));
    }

    #[test]
    fn short_window_passes_three_prime() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);
        assert!(validator.check_three_prime(&bases("GGCC")));
        assert!(!validator.check_three_prime(&bases("AGGCCG")));
        assert!(validator.check_three_prime(&bases("GGCAA")));
    }

    #[test]
    fn first_failure_short_circuits() {
        let config = ValidationConfig::default();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        let verdict = validator.check_window(&bases("AAAAAGC"));
        assert_eq!(verdict.failed, Some(Rule::HomopolymerRuns));
        assert!(verdict.gc.is_none());
        assert_eq!(thermo.call_counts().total(), 0);
    }

    #[test]
    fn gc_failure_records_measurement() {
        let config = ValidationConfig::default();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        let verdict = validator.check_window(&bases("ATTAATTA"));
        assert_eq!(verdict.failed, Some(Rule::GcContent));
        assert_eq!(verdict.gc, Some(0.0));
        assert!(verdict.tm.is_none());
    }

    #[test]
    fn disabled_rules_pass() {
        let mut config = ValidationConfig::default();
        config.rules = RuleSet::none();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);
        assert!(validator.is_window_acceptable(&bases("AAAAAAAAAA"), None));
        assert_eq!(thermo.call_counts().total(), 0);
    }

    #[test]
    fn rejection_is_counted_in_stats() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);
        let mut stats = GenerationStats::default();

        assert!(!validator.is_window_acceptable(&bases("CCCCC"), Some(&mut stats)));
        assert_eq!(stats.rule_failures.get(&Rule::HomopolymerRuns), Some(&1));
    }

    #[test]
    fn seed_check_uses_position_independent_rules() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        assert_eq!(validator.check_seed(&bases("CCCCCC")), Some(Rule::HomopolymerRuns));
        assert_eq!(
            validator.check_seed(&bases("GCATATATG")),
            Some(Rule::DinucleotideRepeats)
        );
        // Heavy 3' end is allowed in the seed.
        assert_eq!(validator.check_seed(&bases("CCTGTCATCACGCTAGTAAC")), None);
        assert_eq!(validator.check_seed(&bases("ATGC")), None);
    }

    #[test]
    fn analysis_computes_disabled_metrics() {
        let mut config = ValidationConfig::default();
        config.rules = RuleSet::none();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        let metrics = validator.analyze_sequence(&bases("AAAAAAGGGGGG"));
        assert!(metrics.is_valid);
        assert!(metrics.has_homopolymers);
        assert_eq!(metrics.melting_temperature, 36.0);
        assert_eq!(metrics.length, 12);
        assert_eq!(thermo.call_counts().total(), 3);
    }

    #[test]
    fn analysis_lists_violations() {
        let config = sequence_only();
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        let metrics = validator.analyze_sequence(&bases("ATATATCCCCCGG"));
        assert!(!metrics.is_valid);
        assert_eq!(
            metrics.violations,
            vec![
                Rule::HomopolymerRuns,
                Rule::DinucleotideRepeats,
                Rule::ThreePrimeStability
            ]
        );
    }

    #[test]
    fn scan_covers_every_window() {
        let mut config = sequence_only();
        config.thresholds.window_size = 5;
        let thermo = ThermodynamicAdapter::fallback();
        let validator = Validator::new(&config, &thermo);

        let reports = validator.scan_windows(&bases("ATGCATGC"));
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].sequence, "ATGCA");
        assert_eq!(reports[3].window_start, 3);
        assert_eq!(reports[3].window_end, 8);
        assert!(validator.scan_windows(&bases("ATG")).is_empty());
    }

    #[test]
    fn rule_names_are_snake_case() {
        assert_eq!(Rule::ThreePrimeStability.to_string(), "three_prime_stability");
        let json = serde_json::to_string(&Rule::GcContent).expect("serialize");
        assert_eq!(json, "\"gc_content\"");
    }
}
