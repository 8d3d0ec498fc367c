//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{AnalyzeArgs, GenerateArgs, ThermoBackendArg, ValidationArgs};
use crate::output;
use seqforge_core::{
    BackendKind, ConfigOverrides, GeneratorConfig, Generator, ProfileCatalog, SeqforgeError,
    ThermoParams, ThermodynamicAdapter, Validator, parse_sequence, thermo, to_string,
};
use std::path::Path;

/// Sequence used to report sample temperatures in `thermo-status`.
const STATUS_PROBE: &str = "ATGCGATCCAGTGCATGGAC";

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Built-in profiles plus the optional document, and the profile to apply.
///
/// Without `--profile`, a document that defines exactly one profile selects it.
fn load_profiles(
    validation: &ValidationArgs,
) -> Result<(ProfileCatalog, Option<String>), SeqforgeError> {
    let mut catalog = ProfileCatalog::builtin()?;
    let mut selected = validation.profile.clone();

    if let Some(path) = &validation.profile_file {
        let loaded = catalog.merge_file(path)?;
        tracing::info!(path = %path.display(), profiles = ?loaded, "loaded profile document");
        if selected.is_none()
            && let [only] = loaded.as_slice()
        {
            selected = Some(only.clone());
        }
    }
    Ok((catalog, selected))
}

fn resolve_config(
    validation: &ValidationArgs,
    overrides: &ConfigOverrides,
) -> Result<GeneratorConfig, SeqforgeError> {
    let (catalog, selected) = load_profiles(validation)?;
    let profile = selected.as_deref().map(|name| catalog.get(name)).transpose()?;
    if let Some(profile) = profile {
        tracing::info!(profile = %profile.name, "using validation profile");
    }
    GeneratorConfig::resolve(profile, overrides)
}

fn build_adapter(
    backend: ThermoBackendArg,
    config: &GeneratorConfig,
) -> Result<ThermodynamicAdapter, SeqforgeError> {
    let params = config.validation.thermo;
    let adapter = match backend {
        ThermoBackendArg::Auto => ThermodynamicAdapter::detect(params),
        ThermoBackendArg::Fallback => ThermodynamicAdapter::fallback(),
        ThermoBackendArg::Primer3 => ThermodynamicAdapter::primer3(params)?,
    };
    if adapter.backend_kind() == BackendKind::Fallback && config.validation.rules.any_thermodynamic()
    {
        tracing::warn!(
            "primer3 tools not in use; thermodynamic rules rely on closed-form approximations \
             that rarely admit 20 nt windows at the default Tm range. \
             Try --profile sequence_only or --profile relaxed"
        );
    }
    Ok(adapter)
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<(), SeqforgeError> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| {
                SeqforgeError::IoError(format!("Cannot write '{}': {e}", path.display()))
            })?;
            tracing::info!(path = %path.display(), "results written");
            Ok(())
        }
        None => {
            print!("{rendered}");
            Ok(())
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Generate sequences. `Ok(true)` when at least one succeeded.
pub fn cmd_generate(args: &GenerateArgs) -> Result<bool, SeqforgeError> {
    if args.count == 0 {
        return Err(SeqforgeError::InvalidConfig(
            "count must be at least 1".to_string(),
        ));
    }
    let config = resolve_config(&args.validation, &args.overrides())?;
    let adapter = build_adapter(args.validation.thermo_backend, &config)?;
    tracing::info!(config = %config, "generating");

    let generator = Generator::with_adapter(config, adapter);
    let results = generator.generate_multiple(&args.initial, args.length, args.count, args.seed)?;

    let rendered = output::render_results(&results, args.format, args.sequences_only)?;
    write_output(args.output.as_deref(), &rendered)?;

    if let Some(path) = &args.csv_file {
        match results.iter().find_map(|r| r.sequence.as_deref()) {
            Some(sequence) => {
                let bases = parse_sequence(sequence)?;
                let reports = generator.validator().scan_windows(&bases);
                output::write_windows_csv(path, &reports)?;
                tracing::info!(path = %path.display(), windows = reports.len(), "window analysis exported");
            }
            None => tracing::warn!("no successful sequence; window analysis not exported"),
        }
    }

    tracing::info!("{}", output::summary_line(&results));
    Ok(results.iter().any(|r| r.success))
}

/// Analyze an existing sequence.
pub fn cmd_analyze(args: &AnalyzeArgs) -> Result<(), SeqforgeError> {
    let config = resolve_config(&args.validation, &args.validation.overrides())?;
    let adapter = build_adapter(args.validation.thermo_backend, &config)?;
    let bases = parse_sequence(&args.sequence)?;

    let validator = Validator::new(&config.validation, &adapter);
    let metrics = validator.analyze_sequence(&bases);
    print!(
        "{}",
        output::render_metrics(&to_string(&bases), &metrics, args.format)?
    );

    if let Some(path) = &args.csv_file {
        let reports = validator.scan_windows(&bases);
        output::write_windows_csv(path, &reports)?;
        tracing::info!(path = %path.display(), windows = reports.len(), "window analysis exported");
    }
    Ok(())
}

/// List profiles with their resolved settings.
pub fn cmd_profiles(profile_file: Option<&Path>) -> Result<(), SeqforgeError> {
    let catalog = match profile_file {
        Some(path) => ProfileCatalog::with_file(path)?,
        None => ProfileCatalog::builtin()?,
    };

    println!("Validation profiles ({}):", catalog.len());
    for profile in catalog.iter() {
        let config = GeneratorConfig::resolve(Some(profile), &ConfigOverrides::default())?;
        let rules = config
            .validation
            .rules
            .enabled()
            .map(|rule| rule.as_str())
            .collect::<Vec<_>>();
        println!("  {}", profile.name);
        if !profile.description.is_empty() {
            println!("    {}", profile.description);
        }
        println!("    {config}");
        if rules.is_empty() {
            println!("    rules: none");
        } else {
            println!("    rules: {}", rules.join(", "));
        }
    }
    Ok(())
}

/// Report the thermodynamic backend that `auto` would pick.
pub fn cmd_thermo_status() -> Result<(), SeqforgeError> {
    let params = ThermoParams::default();
    let adapter = ThermodynamicAdapter::detect(params);
    let probe = parse_sequence(STATUS_PROBE)?;

    println!("Thermodynamic backend: {}", adapter.backend_kind());
    println!(
        "Tool overrides: {}, {}",
        thermo::OLIGOTM_ENV,
        thermo::NTTHAL_ENV
    );
    println!(
        "Conditions: Na+ {} mM, Mg2+ {} mM, dNTP {} mM, oligo {} nM",
        params.mv_conc, params.dv_conc, params.dntp_conc, params.dna_conc
    );
    println!("Probe {STATUS_PROBE}:");
    println!("  Tm: {:.2}°C", adapter.melting_temperature(&probe));
    println!("  hairpin: {:.2}°C", adapter.hairpin_temperature(&probe));
    println!("  homodimer: {:.2}°C", adapter.homodimer_temperature(&probe));
    Ok(())
}
