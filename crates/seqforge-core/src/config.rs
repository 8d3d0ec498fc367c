//! # Configuration
//!
//! Resolved, immutable configuration for one generation call.
//!
//! A [`GeneratorConfig`] is produced once by a pure merge:
//!
//! ```text
//! defaults  ⊕  profile (optional)  ⊕  explicit overrides
//! ```
//!
//! and then only read. The validator and the heuristic scorer borrow the
//! [`ValidationConfig`] half; the engine reads the [`SearchConfig`] half.

use crate::SeqforgeError;
use crate::primitives::MIN_WINDOW_SIZE;
use crate::profile::{Profile, ProfileParams};
use crate::validator::Rule;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// GENERATION MODE
// =============================================================================

/// How the engine resolves near-ties between candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Best candidate; exact ties broken by the seeded source.
    #[default]
    Deterministic,
    /// Uniform choice among all candidates within a margin of the best.
    Random,
}

impl GenerationMode {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RULE SET
// =============================================================================

/// Enable flags for the seven validator rules.
///
/// Missing keys in a document default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub gc_content: bool,
    pub melting_temperature: bool,
    pub hairpin_structures: bool,
    pub homodimer_structures: bool,
    pub homopolymer_runs: bool,
    pub dinucleotide_repeats: bool,
    pub three_prime_stability: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::all()
    }
}

impl RuleSet {
    /// Every rule enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            gc_content: true,
            melting_temperature: true,
            hairpin_structures: true,
            homodimer_structures: true,
            homopolymer_runs: true,
            dinucleotide_repeats: true,
            three_prime_stability: true,
        }
    }

    /// Every rule disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            gc_content: false,
            melting_temperature: false,
            hairpin_structures: false,
            homodimer_structures: false,
            homopolymer_runs: false,
            dinucleotide_repeats: false,
            three_prime_stability: false,
        }
    }

    /// Whether `rule` is enabled.
    #[must_use]
    pub fn is_enabled(&self, rule: Rule) -> bool {
        match rule {
            Rule::GcContent => self.gc_content,
            Rule::MeltingTemperature => self.melting_temperature,
            Rule::HairpinStructures => self.hairpin_structures,
            Rule::HomodimerStructures => self.homodimer_structures,
            Rule::HomopolymerRuns => self.homopolymer_runs,
            Rule::DinucleotideRepeats => self.dinucleotide_repeats,
            Rule::ThreePrimeStability => self.three_prime_stability,
        }
    }

    /// True if any rule needs the thermodynamic adapter.
    #[must_use]
    pub fn any_thermodynamic(&self) -> bool {
        self.melting_temperature || self.hairpin_structures || self.homodimer_structures
    }

    /// Enabled rules in evaluation order.
    pub fn enabled(&self) -> impl Iterator<Item = Rule> + '_ {
        Rule::EVALUATION_ORDER
            .into_iter()
            .filter(|rule| self.is_enabled(*rule))
    }
}

/// Partial rule flags; `None` keeps the value from the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleOverrides {
    pub gc_content: Option<bool>,
    pub melting_temperature: Option<bool>,
    pub hairpin_structures: Option<bool>,
    pub homodimer_structures: Option<bool>,
    pub homopolymer_runs: Option<bool>,
    pub dinucleotide_repeats: Option<bool>,
    pub three_prime_stability: Option<bool>,
}

impl RuleOverrides {
    /// Overlay these flags on `base`.
    #[must_use]
    pub fn apply(&self, base: RuleSet) -> RuleSet {
        RuleSet {
            gc_content: self.gc_content.unwrap_or(base.gc_content),
            melting_temperature: self.melting_temperature.unwrap_or(base.melting_temperature),
            hairpin_structures: self.hairpin_structures.unwrap_or(base.hairpin_structures),
            homodimer_structures: self
                .homodimer_structures
                .unwrap_or(base.homodimer_structures),
            homopolymer_runs: self.homopolymer_runs.unwrap_or(base.homopolymer_runs),
            dinucleotide_repeats: self
                .dinucleotide_repeats
                .unwrap_or(base.dinucleotide_repeats),
            three_prime_stability: self
                .three_prime_stability
                .unwrap_or(base.three_prime_stability),
        }
    }

    /// Force one rule on or off.
    pub fn set(&mut self, rule: Rule, enabled: bool) {
        let slot = match rule {
            Rule::GcContent => &mut self.gc_content,
            Rule::MeltingTemperature => &mut self.melting_temperature,
            Rule::HairpinStructures => &mut self.hairpin_structures,
            Rule::HomodimerStructures => &mut self.homodimer_structures,
            Rule::HomopolymerRuns => &mut self.homopolymer_runs,
            Rule::DinucleotideRepeats => &mut self.dinucleotide_repeats,
            Rule::ThreePrimeStability => &mut self.three_prime_stability,
        };
        *slot = Some(enabled);
    }
}

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Numeric bounds checked by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum window GC fraction (0.0 to 1.0).
    pub min_gc: f64,
    /// Maximum window GC fraction (0.0 to 1.0).
    pub max_gc: f64,
    /// Minimum window melting temperature [°C].
    pub min_tm: f64,
    /// Maximum window melting temperature [°C].
    pub max_tm: f64,
    /// Hairpin temperature cap [°C].
    pub max_hairpin_tm: f64,
    /// Homodimer temperature cap [°C].
    pub max_homodimer_tm: f64,
    /// Number of trailing symbols every rule looks at.
    pub window_size: usize,
    /// Longest allowed run of one symbol.
    pub max_homopolymer_length: usize,
    /// Most allowed consecutive copies of one dinucleotide.
    pub max_dinucleotide_repeats: usize,
    /// Most allowed G/C symbols among the last five.
    pub max_3prime_gc: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_gc: 0.45,
            max_gc: 0.55,
            min_tm: 55.0,
            max_tm: 65.0,
            max_hairpin_tm: 30.0,
            max_homodimer_tm: 30.0,
            window_size: 20,
            max_homopolymer_length: 4,
            max_dinucleotide_repeats: 2,
            max_3prime_gc: 3,
        }
    }
}

// =============================================================================
// THERMODYNAMIC PARAMETERS
// =============================================================================

/// Salt and oligo concentrations passed to the external calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermoParams {
    /// Monovalent cation concentration [mM].
    pub mv_conc: f64,
    /// Divalent cation concentration [mM].
    pub dv_conc: f64,
    /// dNTP concentration [mM].
    pub dntp_conc: f64,
    /// DNA concentration [nM].
    pub dna_conc: f64,
}

impl Default for ThermoParams {
    fn default() -> Self {
        Self {
            mv_conc: 50.0,
            dv_conc: 4.0,
            dntp_conc: 0.5,
            dna_conc: 50.0,
        }
    }
}

// =============================================================================
// VALIDATION CONFIG
// =============================================================================

/// Everything the validator and scorer read.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub rules: RuleSet,
    pub thresholds: Thresholds,
    pub thermo: ThermoParams,
}

impl ValidationConfig {
    /// GC fraction the scorer steers towards, when the GC rule is enabled.
    #[must_use]
    pub fn target_gc(&self) -> Option<f64> {
        self.rules
            .gc_content
            .then(|| (self.thresholds.min_gc + self.thresholds.max_gc) / 2.0)
    }

    /// Short text identifying the parameters that shape derived seeds.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}_{:.2}_{:.2}",
            self.thresholds.window_size, self.thresholds.min_gc, self.thresholds.max_gc
        )
    }
}

// =============================================================================
// SEARCH CONFIG
// =============================================================================

/// Parameters of the search itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mode: GenerationMode,
    /// Fixed seed; `None` lets the generator derive or draw one.
    pub seed: Option<u64>,
    /// Upper bound on engine loop iterations.
    pub max_backtrack_attempts: usize,
    /// Rank candidates with the heuristic scorer instead of drawing uniformly.
    pub heuristics: bool,
    /// Emit periodic progress lines at info level.
    pub progress_logging: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Deterministic,
            seed: None,
            max_backtrack_attempts: 10_000,
            heuristics: true,
            progress_logging: true,
        }
    }
}

// =============================================================================
// OVERRIDES
// =============================================================================

/// Explicit caller choices, applied on top of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub rules: RuleOverrides,
    pub params: ProfileParams,
    pub thermo: Option<ThermoParams>,
    pub mode: Option<GenerationMode>,
    pub seed: Option<u64>,
    pub max_backtrack_attempts: Option<usize>,
    pub heuristics: Option<bool>,
    pub progress_logging: Option<bool>,
}

// =============================================================================
// GENERATOR CONFIG
// =============================================================================

/// Fully resolved configuration for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub validation: ValidationConfig,
    pub search: SearchConfig,
}

impl GeneratorConfig {
    /// Merge defaults, an optional profile and explicit overrides, then validate.
    ///
    /// Later layers win. The result is never mutated by the engine.
    pub fn resolve(
        profile: Option<&Profile>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, SeqforgeError> {
        let mut validation = ValidationConfig::default();
        let mut search = SearchConfig::default();

        if let Some(profile) = profile {
            validation.rules = profile.rules.apply(validation.rules);
            profile.params.apply(&mut validation.thresholds);
            if let Some(heuristics) = profile.heuristics {
                search.heuristics = heuristics;
            }
        }

        validation.rules = overrides.rules.apply(validation.rules);
        overrides.params.apply(&mut validation.thresholds);
        if let Some(thermo) = overrides.thermo {
            validation.thermo = thermo;
        }

        search.mode = overrides.mode.unwrap_or(search.mode);
        search.seed = overrides.seed.or(search.seed);
        search.max_backtrack_attempts = overrides
            .max_backtrack_attempts
            .unwrap_or(search.max_backtrack_attempts);
        search.heuristics = overrides.heuristics.unwrap_or(search.heuristics);
        search.progress_logging = overrides
            .progress_logging
            .unwrap_or(search.progress_logging);

        let config = Self { validation, search };
        config.validate()?;

        tracing::debug!(
            profile = profile.map(|p| p.name.as_str()),
            config = %config,
            "resolved generator configuration"
        );
        Ok(config)
    }

    /// Check ranges and internal consistency.
    pub fn validate(&self) -> Result<(), SeqforgeError> {
        let t = &self.validation.thresholds;
        let thermo = &self.validation.thermo;

        if !(0.0..=1.0).contains(&t.min_gc) {
            return Err(invalid(format!("min_gc must be in [0.0, 1.0], got {}", t.min_gc)));
        }
        if !(0.0..=1.0).contains(&t.max_gc) {
            return Err(invalid(format!("max_gc must be in [0.0, 1.0], got {}", t.max_gc)));
        }
        if t.min_gc > t.max_gc {
            return Err(invalid(format!(
                "min_gc ({}) cannot be greater than max_gc ({})",
                t.min_gc, t.max_gc
            )));
        }

        if !(0.0..).contains(&t.min_tm) {
            return Err(invalid(format!("min_tm cannot be negative, got {}", t.min_tm)));
        }
        if t.max_tm.is_nan() || t.min_tm > t.max_tm {
            return Err(invalid(format!(
                "min_tm ({}) cannot be greater than max_tm ({})",
                t.min_tm, t.max_tm
            )));
        }
        if t.max_hairpin_tm.is_nan() || t.max_homodimer_tm.is_nan() {
            return Err(invalid("structure temperature caps must be numbers".to_string()));
        }

        if !(thermo.mv_conc > 0.0) {
            return Err(invalid(format!("mv_conc must be positive, got {}", thermo.mv_conc)));
        }
        if !(0.0..).contains(&thermo.dv_conc) {
            return Err(invalid(format!("dv_conc cannot be negative, got {}", thermo.dv_conc)));
        }
        if !(0.0..).contains(&thermo.dntp_conc) {
            return Err(invalid(format!(
                "dntp_conc cannot be negative, got {}",
                thermo.dntp_conc
            )));
        }
        if !(thermo.dna_conc > 0.0) {
            return Err(invalid(format!("dna_conc must be positive, got {}", thermo.dna_conc)));
        }

        if t.window_size < MIN_WINDOW_SIZE {
            return Err(invalid(format!(
                "window_size must be >= {MIN_WINDOW_SIZE}, got {}",
                t.window_size
            )));
        }
        if t.max_homopolymer_length < 2 {
            return Err(invalid(format!(
                "max_homopolymer_length must be >= 2, got {}",
                t.max_homopolymer_length
            )));
        }
        if t.max_dinucleotide_repeats < 1 {
            return Err(invalid(format!(
                "max_dinucleotide_repeats must be >= 1, got {}",
                t.max_dinucleotide_repeats
            )));
        }
        if t.max_3prime_gc > 5 {
            return Err(invalid(format!(
                "max_3prime_gc must be in [0, 5], got {}",
                t.max_3prime_gc
            )));
        }

        if self.search.max_backtrack_attempts < 1 {
            return Err(invalid(format!(
                "max_backtrack_attempts must be >= 1, got {}",
                self.search.max_backtrack_attempts
            )));
        }

        Ok(())
    }
}

impl fmt::Display for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.validation.thresholds;
        write!(
            f,
            "GeneratorConfig(mode={}, GC={:.0}%-{:.0}%, Tm={:.0}-{:.0}°C, window={}bp, heuristics={})",
            self.search.mode,
            t.min_gc * 100.0,
            t.max_gc * 100.0,
            t.min_tm,
            t.max_tm,
            t.window_size,
            self.search.heuristics
        )
    }
}

fn invalid(message: String) -> SeqforgeError {
    SeqforgeError::InvalidConfig(message)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(params: ProfileParams, rules: RuleOverrides) -> Profile {
        Profile {
            name: "test".to_string(),
            description: "test profile".to_string(),
            rules,
            params,
            heuristics: None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validation.rules.gc_content);
        assert_eq!(config.validation.thresholds.window_size, 20);
        assert_eq!(config.search.max_backtrack_attempts, 10_000);
    }

    #[test]
    fn overrides_win_over_profile() {
        let profile = profile_with(
            ProfileParams {
                min_gc: Some(0.3),
                max_gc: Some(0.7),
                ..Default::default()
            },
            RuleOverrides {
                gc_content: Some(false),
                ..Default::default()
            },
        );
        let overrides = ConfigOverrides {
            params: ProfileParams {
                max_gc: Some(0.6),
                ..Default::default()
            },
            rules: RuleOverrides {
                gc_content: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = GeneratorConfig::resolve(Some(&profile), &overrides).expect("resolve");
        assert_eq!(config.validation.thresholds.min_gc, 0.3);
        assert_eq!(config.validation.thresholds.max_gc, 0.6);
        assert!(config.validation.rules.gc_content);
    }

    #[test]
    fn profile_can_disable_heuristics() {
        let mut profile = profile_with(ProfileParams::default(), RuleOverrides::default());
        profile.heuristics = Some(false);

        let config =
            GeneratorConfig::resolve(Some(&profile), &ConfigOverrides::default()).expect("resolve");
        assert!(!config.search.heuristics);

        let forced = ConfigOverrides {
            heuristics: Some(true),
            ..Default::default()
        };
        let config = GeneratorConfig::resolve(Some(&profile), &forced).expect("resolve");
        assert!(config.search.heuristics);
    }

    #[test]
    fn inverted_gc_bounds_are_rejected() {
        let overrides = ConfigOverrides {
            params: ProfileParams {
                min_gc: Some(0.7),
                max_gc: Some(0.3),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = GeneratorConfig::resolve(None, &overrides).expect_err("inconsistent");
        assert!(err.is_config_error());
    }

    #[test]
    fn small_window_is_rejected() {
        let overrides = ConfigOverrides {
            params: ProfileParams {
                window_size: Some(4),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(GeneratorConfig::resolve(None, &overrides).is_err());
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let overrides = ConfigOverrides {
            params: ProfileParams {
                min_tm: Some(f64::NAN),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(GeneratorConfig::resolve(None, &overrides).is_err());
    }

    #[test]
    fn target_gc_follows_rule_flag() {
        let mut config = ValidationConfig::default();
        assert!((config.target_gc().expect("enabled") - 0.5).abs() < 1e-12);
        config.rules.gc_content = false;
        assert!(config.target_gc().is_none());
    }

    #[test]
    fn rule_overrides_set_single_rule() {
        let mut overrides = RuleOverrides::default();
        overrides.set(Rule::HairpinStructures, false);
        let rules = overrides.apply(RuleSet::all());
        assert!(!rules.hairpin_structures);
        assert!(rules.homodimer_structures);
        assert_eq!(rules.enabled().count(), 6);
    }

    #[test]
    fn display_summarizes_mode_and_window() {
        let text = GeneratorConfig::default().to_string();
        assert!(text.contains("deterministic"));
        assert!(text.contains("window=20bp"));
    }
}
