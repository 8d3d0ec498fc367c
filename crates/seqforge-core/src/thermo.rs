//! # Thermodynamic Adapter
//!
//! Melting, hairpin and homodimer temperatures for short windows.
//!
//! Two backends sit behind [`ThermoBackend`]:
//!
//! - [`Primer3Backend`] shells out to the primer3 command-line tools
//!   (`oligotm`, `ntthal`) with the configured salt and oligo concentrations.
//! - [`FallbackBackend`] answers with closed-form approximations and never fails.
//!
//! The backend is chosen once, when the adapter is built. Faults of the
//! external tools are absorbed: the adapter logs them at debug level and
//! answers with the fallback formula for that call.

use crate::alphabet::{Base, gc_count, to_string};
use crate::config::ThermoParams;
use crate::primitives::{
    AT_PAIR_DEGREES, GC_PAIR_DEGREES, MIN_HAIRPIN_LOOP, MIN_STEM_PAIRS, THERMO_CACHE_CAPACITY,
    WALLACE_MAX_LENGTH,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Environment variable overriding the `oligotm` executable.
pub const OLIGOTM_ENV: &str = "SEQFORGE_OLIGOTM_BIN";

/// Environment variable overriding the `ntthal` executable.
pub const NTTHAL_ENV: &str = "SEQFORGE_NTTHAL_BIN";

const PROBE_SEQUENCE: &str = "ACGTACGTACGTACGTACGT";

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Which backend an adapter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Primer3,
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primer3 => f.write_str("primer3"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Faults raised by a backend. Never leaves the adapter.
#[derive(Debug, Error)]
pub enum ThermoError {
    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("tool '{tool}' exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error running '{tool}': {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse output of '{tool}': {output}")]
    Parse { tool: String, output: String },
}

/// A source of temperature estimates.
pub trait ThermoBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Duplex melting temperature [°C].
    fn melting_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError>;

    /// Hairpin melting temperature [°C]; 0.0 when no structure forms.
    fn hairpin_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError>;

    /// Homodimer melting temperature [°C]; 0.0 when no structure forms.
    fn homodimer_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError>;
}

// =============================================================================
// FALLBACK BACKEND
// =============================================================================

/// Closed-form estimates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackBackend;

impl FallbackBackend {
    /// Wallace rule up to 14 symbols, GC-corrected formula above.
    #[must_use]
    pub fn tm(sequence: &[Base]) -> f64 {
        let length = sequence.len();
        if length == 0 {
            return 0.0;
        }
        let gc = gc_count(sequence) as f64;
        let at = (length - gc_count(sequence)) as f64;
        if length <= WALLACE_MAX_LENGTH {
            2.0 * at + 4.0 * gc
        } else {
            let length = length as f64;
            64.9 + 41.0 * (gc / length - 16.4 / length)
        }
    }

    /// Best hairpin stem: arms pair antiparallel around a loop of at least
    /// [`MIN_HAIRPIN_LOOP`] symbols.
    #[must_use]
    pub fn hairpin(sequence: &[Base]) -> f64 {
        let n = sequence.len();
        let mut best = 0.0_f64;
        for i in 0..n {
            for j in (i + 1)..n {
                let mut pairs = 0;
                let mut degrees = 0.0;
                while i + pairs < j - pairs {
                    let left = i + pairs;
                    let right = j - pairs;
                    if right - left - 1 < MIN_HAIRPIN_LOOP
                        || !sequence[left].pairs_with(sequence[right])
                    {
                        break;
                    }
                    degrees += pair_degrees(sequence[left]);
                    pairs += 1;
                }
                if pairs >= MIN_STEM_PAIRS {
                    best = best.max(degrees);
                }
            }
        }
        best
    }

    /// Longest antiparallel complementary run of the sequence against itself.
    #[must_use]
    pub fn homodimer(sequence: &[Base]) -> f64 {
        let n = sequence.len();
        let mut best = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                // Only start at the beginning of a run.
                if i > 0 && j + 1 < n && sequence[i - 1].pairs_with(sequence[j + 1]) {
                    continue;
                }
                let mut pairs = 0;
                let mut degrees = 0.0;
                while i + pairs < n
                    && pairs <= j
                    && sequence[i + pairs].pairs_with(sequence[j - pairs])
                {
                    degrees += pair_degrees(sequence[i + pairs]);
                    pairs += 1;
                }
                if pairs >= MIN_STEM_PAIRS {
                    best = best.max(degrees);
                }
            }
        }
        best
    }
}

fn pair_degrees(base: Base) -> f64 {
    if base.is_gc() {
        GC_PAIR_DEGREES
    } else {
        AT_PAIR_DEGREES
    }
}

impl ThermoBackend for FallbackBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn melting_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        Ok(Self::tm(sequence))
    }

    fn hairpin_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        Ok(Self::hairpin(sequence))
    }

    fn homodimer_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        Ok(Self::homodimer(sequence))
    }
}

// =============================================================================
// PRIMER3 BACKEND
// =============================================================================

/// Nearest-neighbor estimates from the primer3 command-line tools.
#[derive(Debug, Clone)]
pub struct Primer3Backend {
    oligotm: PathBuf,
    ntthal: PathBuf,
    params: ThermoParams,
}

impl Primer3Backend {
    /// Locate both tools and check that `oligotm` answers.
    pub fn probe(params: ThermoParams) -> Result<Self, ThermoError> {
        let backend = Self {
            oligotm: locate_tool("oligotm", OLIGOTM_ENV)?,
            ntthal: locate_tool("ntthal", NTTHAL_ENV)?,
            params,
        };
        let probe: Vec<Base> = PROBE_SEQUENCE.chars().filter_map(Base::from_char).collect();
        backend.melting_temperature(&probe)?;
        Ok(backend)
    }

    fn concentration_args(&self) -> [String; 8] {
        [
            "-mv".to_string(),
            self.params.mv_conc.to_string(),
            "-dv".to_string(),
            self.params.dv_conc.to_string(),
            "-n".to_string(),
            self.params.dntp_conc.to_string(),
            "-d".to_string(),
            self.params.dna_conc.to_string(),
        ]
    }

    fn ntthal(&self, mode: &str, sequence: &[Base], dimer: bool) -> Result<f64, ThermoError> {
        let text = to_string(sequence);
        let mut args: Vec<String> = self.concentration_args().to_vec();
        args.extend(["-a".to_string(), mode.to_string(), "-s1".to_string(), text.clone()]);
        if dimer {
            args.extend(["-s2".to_string(), text]);
        }
        args.push("-r".to_string());
        let output = run_tool(&self.ntthal, &args)?;
        if output.contains("No secondary structure") {
            return Ok(0.0);
        }
        parse_first_float(&output).ok_or_else(|| ThermoError::Parse {
            tool: "ntthal".to_string(),
            output,
        })
    }
}

impl ThermoBackend for Primer3Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Primer3
    }

    fn melting_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        let mut args: Vec<String> = self.concentration_args().to_vec();
        args.push(to_string(sequence));
        let output = run_tool(&self.oligotm, &args)?;
        parse_first_float(&output).ok_or_else(|| ThermoError::Parse {
            tool: "oligotm".to_string(),
            output,
        })
    }

    fn hairpin_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        self.ntthal("HAIRPIN", sequence, false)
    }

    fn homodimer_temperature(&self, sequence: &[Base]) -> Result<f64, ThermoError> {
        self.ntthal("ANY", sequence, true)
    }
}

fn locate_tool(name: &str, env_key: &str) -> Result<PathBuf, ThermoError> {
    if let Some(path) = std::env::var_os(env_key).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    std::env::var_os("PATH")
        .into_iter()
        .flat_map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ThermoError::ToolNotFound(name.to_string()))
}

fn run_tool(path: &Path, args: &[String]) -> Result<String, ThermoError> {
    let tool = path.display().to_string();
    let output = Command::new(path)
        .args(args)
        .output()
        .map_err(|source| ThermoError::Io {
            tool: tool.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(ThermoError::ToolFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First decimal number in `text`.
fn parse_first_float(text: &str) -> Option<f64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse::<f64>().ok())
}

// =============================================================================
// ADAPTER
// =============================================================================

/// Number of adapter calls per quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThermoCallCounts {
    pub melting: u64,
    pub hairpin: u64,
    pub homodimer: u64,
}

impl ThermoCallCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.melting + self.hairpin + self.homodimer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Quantity {
    Melting,
    Hairpin,
    Homodimer,
}

/// Front door for temperature estimates.
///
/// `Send + Sync`; one adapter may be shared by several generators.
pub struct ThermodynamicAdapter {
    backend: Box<dyn ThermoBackend>,
    melting_calls: AtomicU64,
    hairpin_calls: AtomicU64,
    homodimer_calls: AtomicU64,
    cache: Mutex<BTreeMap<(Quantity, Vec<Base>), f64>>,
}

impl fmt::Debug for ThermodynamicAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThermodynamicAdapter")
            .field("backend", &self.backend.kind())
            .field("calls", &self.call_counts())
            .finish()
    }
}

impl ThermodynamicAdapter {
    /// Probe for primer3 once; use the closed-form backend if it is missing.
    #[must_use]
    pub fn detect(params: ThermoParams) -> Self {
        match Primer3Backend::probe(params) {
            Ok(backend) => {
                tracing::debug!("primer3 tools available, using nearest-neighbor backend");
                Self::with_backend(Box::new(backend))
            }
            Err(e) => {
                tracing::debug!(error = %e, "primer3 tools unavailable, using fallback backend");
                Self::fallback()
            }
        }
    }

    /// Closed-form backend only.
    #[must_use]
    pub fn fallback() -> Self {
        Self::with_backend(Box::new(FallbackBackend))
    }

    /// Require the primer3 tools.
    pub fn primer3(params: ThermoParams) -> Result<Self, crate::SeqforgeError> {
        Primer3Backend::probe(params)
            .map(|backend| Self::with_backend(Box::new(backend)))
            .map_err(|e| {
                crate::SeqforgeError::InvalidConfig(format!("primer3 backend unavailable: {e}"))
            })
    }

    /// Wrap a custom backend.
    #[must_use]
    pub fn with_backend(backend: Box<dyn ThermoBackend>) -> Self {
        Self {
            backend,
            melting_calls: AtomicU64::new(0),
            hairpin_calls: AtomicU64::new(0),
            homodimer_calls: AtomicU64::new(0),
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Calls made so far.
    #[must_use]
    pub fn call_counts(&self) -> ThermoCallCounts {
        ThermoCallCounts {
            melting: self.melting_calls.load(Ordering::Relaxed),
            hairpin: self.hairpin_calls.load(Ordering::Relaxed),
            homodimer: self.homodimer_calls.load(Ordering::Relaxed),
        }
    }

    /// Duplex melting temperature [°C]. 0.0 for empty input.
    pub fn melting_temperature(&self, sequence: &[Base]) -> f64 {
        self.melting_calls.fetch_add(1, Ordering::Relaxed);
        self.evaluate(Quantity::Melting, sequence)
    }

    /// Hairpin temperature [°C]. 0.0 when no structure forms.
    pub fn hairpin_temperature(&self, sequence: &[Base]) -> f64 {
        self.hairpin_calls.fetch_add(1, Ordering::Relaxed);
        self.evaluate(Quantity::Hairpin, sequence)
    }

    /// Homodimer temperature [°C]. 0.0 when no structure forms.
    pub fn homodimer_temperature(&self, sequence: &[Base]) -> f64 {
        self.homodimer_calls.fetch_add(1, Ordering::Relaxed);
        self.evaluate(Quantity::Homodimer, sequence)
    }

    fn evaluate(&self, quantity: Quantity, sequence: &[Base]) -> f64 {
        if sequence.is_empty() {
            return 0.0;
        }
        let key = (quantity, sequence.to_vec());
        if let Ok(cache) = self.cache.lock()
            && let Some(value) = cache.get(&key)
        {
            return *value;
        }

        let computed = match quantity {
            Quantity::Melting => self.backend.melting_temperature(sequence),
            Quantity::Hairpin => self.backend.hairpin_temperature(sequence),
            Quantity::Homodimer => self.backend.homodimer_temperature(sequence),
        };
        let value = computed.unwrap_or_else(|e| {
            tracing::debug!(error = %e, ?quantity, "backend fault, using closed-form estimate");
            match quantity {
                Quantity::Melting => FallbackBackend::tm(sequence),
                Quantity::Hairpin => FallbackBackend::hairpin(sequence),
                Quantity::Homodimer => FallbackBackend::homodimer(sequence),
            }
        });

        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= THERMO_CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(key, value);
        }
        value
    }
}

// =============================================================================
// TESTS
// =============================================================================
