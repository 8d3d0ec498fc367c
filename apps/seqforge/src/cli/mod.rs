//! # seqforge CLI Module
//!
//! This module implements the CLI interface for seqforge.
//!
//! ## Available Commands
//!
//! - `generate` - Extend a seed to a target length under quality rules
//! - `analyze` - Report quality metrics for an existing sequence
//! - `profiles` - List validation profiles
//! - `thermo-status` - Show which thermodynamic backend is active

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use seqforge_core::{ConfigOverrides, GenerationMode, ProfileParams, Rule, SeqforgeError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// seqforge - constrained DNA sequence generator
///
/// Grows a seed sequence one nucleotide at a time with a backtracking search,
/// keeping every sliding window within GC, melting-temperature and
/// secondary-structure limits.
#[derive(Parser, Debug)]
#[command(name = "seqforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log errors only and skip the summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate sequences from a seed
    Generate(GenerateArgs),

    /// Analyze an existing sequence
    Analyze(AnalyzeArgs),

    /// List validation profiles
    Profiles {
        /// Extra profile document (TOML or JSON) merged over the built-ins
        #[arg(long)]
        profile_file: Option<PathBuf>,
    },

    /// Show the thermodynamic backend in use
    ThermoStatus,
}

// =============================================================================
// ARGUMENT GROUPS
// =============================================================================

/// Generation mode.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Deterministic,
    Random,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Deterministic => GenerationMode::Deterministic,
            ModeArg::Random => GenerationMode::Random,
        }
    }
}

/// Thermodynamic backend selection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermoBackendArg {
    /// primer3 tools if present, closed-form otherwise
    #[default]
    Auto,
    /// Closed-form approximations only
    Fallback,
    /// Require the primer3 tools
    Primer3,
}

/// Output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Fasta,
    Json,
}

/// Profile, threshold and rule flags shared by `generate` and `analyze`.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidationArgs {
    /// Validation profile name (see `seqforge profiles`)
    #[arg(long)]
    pub profile: Option<String>,

    /// Profile document (TOML or JSON) merged over the built-ins
    #[arg(long)]
    pub profile_file: Option<PathBuf>,

    /// Minimum window GC fraction (0.0-1.0)
    #[arg(long)]
    pub min_gc: Option<f64>,

    /// Maximum window GC fraction (0.0-1.0)
    #[arg(long)]
    pub max_gc: Option<f64>,

    /// Minimum window melting temperature (°C)
    #[arg(long)]
    pub min_tm: Option<f64>,

    /// Maximum window melting temperature (°C)
    #[arg(long)]
    pub max_tm: Option<f64>,

    /// Maximum hairpin temperature (°C)
    #[arg(long = "max-hairpin")]
    pub max_hairpin: Option<f64>,

    /// Maximum homodimer temperature (°C)
    #[arg(long = "max-homodimer")]
    pub max_homodimer: Option<f64>,

    /// Analysis window size
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Longest allowed single-nucleotide run
    #[arg(long = "max-homopolymer")]
    pub max_homopolymer: Option<usize>,

    /// Most allowed consecutive copies of one dinucleotide
    #[arg(long)]
    pub max_dinucleotide_repeats: Option<usize>,

    /// Most allowed G/C among the last five nucleotides
    #[arg(long = "max-3prime-gc")]
    pub max_3prime_gc: Option<usize>,

    /// Disable the GC content rule
    #[arg(long)]
    pub no_gc_check: bool,

    /// Disable the melting temperature rule
    #[arg(long)]
    pub no_tm_check: bool,

    /// Disable the hairpin rule
    #[arg(long)]
    pub no_hairpin_check: bool,

    /// Disable the homodimer rule
    #[arg(long)]
    pub no_homodimer_check: bool,

    /// Disable the homopolymer rule
    #[arg(long)]
    pub no_homopolymer_check: bool,

    /// Disable the dinucleotide repeat rule
    #[arg(long)]
    pub no_dinucleotide_check: bool,

    /// Disable the 3' stability rule
    #[arg(long = "no-3prime-check")]
    pub no_3prime_check: bool,

    /// Thermodynamic backend
    #[arg(long, value_enum, default_value_t = ThermoBackendArg::Auto)]
    pub thermo_backend: ThermoBackendArg,
}

impl ValidationArgs {
    /// Rule flags and thresholds given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            params: ProfileParams {
                min_gc: self.min_gc,
                max_gc: self.max_gc,
                min_tm: self.min_tm,
                max_tm: self.max_tm,
                max_hairpin_tm: self.max_hairpin,
                max_homodimer_tm: self.max_homodimer,
                window_size: self.window_size,
                max_homopolymer_length: self.max_homopolymer,
                max_dinucleotide_repeats: self.max_dinucleotide_repeats,
                max_3prime_gc: self.max_3prime_gc,
            },
            ..Default::default()
        };

        let disabled = [
            (self.no_gc_check, Rule::GcContent),
            (self.no_tm_check, Rule::MeltingTemperature),
            (self.no_hairpin_check, Rule::HairpinStructures),
            (self.no_homodimer_check, Rule::HomodimerStructures),
            (self.no_homopolymer_check, Rule::HomopolymerRuns),
            (self.no_dinucleotide_check, Rule::DinucleotideRepeats),
            (self.no_3prime_check, Rule::ThreePrimeStability),
        ];
        for (flag, rule) in disabled {
            if flag {
                overrides.rules.set(rule, false);
            }
        }
        overrides
    }
}

/// Arguments of `generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Seed sequence (A, T, G, C; case and whitespace ignored)
    #[arg(short, long)]
    pub initial: String,

    /// Target length of the full sequence, seed included
    #[arg(short, long)]
    pub length: usize,

    /// Generation mode
    #[arg(short, long, value_enum, default_value_t = ModeArg::Deterministic)]
    pub mode: ModeArg,

    /// Number of sequences to generate
    #[arg(short, long, default_value = "1")]
    pub count: usize,

    /// Random seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Upper bound on search steps
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Rank candidates with the heuristic scorer
    #[arg(long, overrides_with = "no_heuristics")]
    pub heuristics: bool,

    /// Draw candidates uniformly instead of ranking them
    #[arg(long)]
    pub no_heuristics: bool,

    #[command(flatten)]
    pub validation: ValidationArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print sequences only, without metrics
    #[arg(long)]
    pub sequences_only: bool,

    /// Export the sliding-window analysis of the first successful sequence
    #[arg(long)]
    pub csv_file: Option<PathBuf>,
}

impl GenerateArgs {
    /// Command-line overrides, validation and search combined.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let heuristics = if self.no_heuristics {
            Some(false)
        } else if self.heuristics {
            Some(true)
        } else {
            None
        };
        ConfigOverrides {
            mode: Some(self.mode.into()),
            seed: self.seed,
            max_backtrack_attempts: self.max_attempts,
            heuristics,
            ..self.validation.overrides()
        }
    }
}

/// Arguments of `analyze`.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Sequence to analyze
    #[arg(short, long)]
    pub sequence: String,

    #[command(flatten)]
    pub validation: ValidationArgs,

    /// Output format (text or json)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Export the sliding-window analysis to CSV
    #[arg(long)]
    pub csv_file: Option<PathBuf>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
///
/// `Ok(false)` means the command ran but produced no successful sequence.
pub fn execute(cli: Cli) -> Result<bool, SeqforgeError> {
    match cli.command {
        Some(Commands::Generate(args)) => cmd_generate(&args),
        Some(Commands::Analyze(args)) => cmd_analyze(&args).map(|()| true),
        Some(Commands::Profiles { profile_file }) => {
            cmd_profiles(profile_file.as_deref()).map(|()| true)
        }
        Some(Commands::ThermoStatus) | None => cmd_thermo_status().map(|()| true),
    }
}
