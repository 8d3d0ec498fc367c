//! # seqforge-core
//!
//! The constrained sequence-construction engine for seqforge - THE ENGINE.
//!
//! This crate grows a caller-supplied seed into a DNA sequence of a target
//! length, one nucleotide at a time, with a backtracking search whose every
//! step is gated by a biochemical validator working on a sliding window.
//!
//! ## Components
//!
//! - `thermo` → melting, hairpin and homodimer temperatures (primer3 or closed form)
//! - `validator` → window rules, seed check, post-hoc `QualityMetrics`
//! - `heuristic` → candidate cost and the selection policy
//! - `random` → seeded random source and seed derivation
//! - `engine` → the backtracking state machine and `GenerationStats`
//! - `generator` → input normalization, seed policy, final metrics
//!
//! ## Determinism
//!
//! For a fixed `(initial_sequence, target_length, seed)` and a fixed
//! [`GeneratorConfig`], two generation calls return identical sequences and
//! identical statistics. Every random draw goes through one per-call
//! [`DeterministicRandom`] in a fixed call order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seqforge_core::{ConfigOverrides, Generator, GeneratorConfig, ProfileCatalog};
//!
//! let catalog = ProfileCatalog::builtin()?;
//! let profile = catalog.get("sequence_only")?;
//! let config = GeneratorConfig::resolve(Some(profile), &ConfigOverrides::default())?;
//!
//! let generator = Generator::new(config);
//! let result = generator.generate("CCTGTCATCACGCTAGTAAC", 120, Some(7))?;
//! if let Some(sequence) = &result.sequence {
//!     println!("{sequence}");
//! }
//! # Ok::<(), seqforge_core::SeqforgeError>(())
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod alphabet;
pub mod config;
pub mod engine;
pub mod generator;
pub mod heuristic;
pub mod primitives;
pub mod profile;
pub mod random;
pub mod thermo;
pub mod types;
pub mod validator;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use alphabet::{ALPHABET, Base, analysis_window, parse_sequence, to_string};
pub use types::SeqforgeError;

// =============================================================================
// RE-EXPORTS: Configuration
// =============================================================================

pub use config::{
    ConfigOverrides, GenerationMode, GeneratorConfig, RuleOverrides, RuleSet, SearchConfig,
    ThermoParams, Thresholds, ValidationConfig,
};
pub use profile::{Profile, ProfileCatalog, ProfileParams};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use engine::{
    BacktrackingEngine, CandidateSet, CandidateStack, EngineState, GenerationStats,
    SearchOutcome, Termination, WindowRollup,
};
pub use generator::{GenerationResult, Generator};
pub use heuristic::HeuristicScorer;
pub use random::{DeterministicRandom, derive_seed};
pub use thermo::{BackendKind, ThermoBackend, ThermoCallCounts, ThermodynamicAdapter};
pub use validator::{
    DinucleotideRepeat, HomopolymerRun, QualityMetrics, Rule, Validator, WindowReport,
    WindowVerdict,
};
