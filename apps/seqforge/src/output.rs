//! # Output Rendering
//!
//! Text, FASTA and JSON renderings of generation results and metrics, and the
//! sliding-window CSV export.

use crate::cli::OutputFormat;
use seqforge_core::{GenerationResult, QualityMetrics, SeqforgeError, WindowReport, WindowRollup};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

// =============================================================================
// GENERATION RESULTS
// =============================================================================

/// Render a batch of generation results.
///
/// With `sequences_only`, text and FASTA carry successful sequences only and
/// JSON is an array of strings.
pub fn render_results(
    results: &[GenerationResult],
    format: OutputFormat,
    sequences_only: bool,
) -> Result<String, SeqforgeError> {
    match format {
        OutputFormat::Text if sequences_only => Ok(successful(results)
            .map(|(_, sequence)| format!("{sequence}\n"))
            .collect()),
        OutputFormat::Text => Ok(render_text(results)),
        OutputFormat::Fasta => Ok(render_fasta(results, sequences_only)),
        OutputFormat::Json if sequences_only => {
            let sequences: Vec<&str> = successful(results).map(|(_, s)| s).collect();
            to_json(&sequences)
        }
        OutputFormat::Json => to_json(results),
    }
}

fn successful(results: &[GenerationResult]) -> impl Iterator<Item = (&GenerationResult, &str)> {
    results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.sequence.as_deref().map(|s| (r, s)))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, SeqforgeError> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| SeqforgeError::SerializationError(e.to_string()))
}

/// FASTA records, one per successful sequence.
#[must_use]
pub fn render_fasta(results: &[GenerationResult], bare_headers: bool) -> String {
    let mut out = String::new();
    for (index, (result, sequence)) in successful(results).enumerate() {
        let _ = write!(out, ">sequence_{}", index + 1);
        if !bare_headers {
            let _ = write!(out, "|length={}", result.actual_length);
            if let Some(metrics) = &result.quality_metrics {
                let _ = write!(out, "|gc={:.1}%", metrics.gc_content * 100.0);
            }
        }
        out.push('\n');
        for chunk in sequence.as_bytes().chunks(FASTA_LINE_WIDTH) {
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }
    }
    out
}

const FASTA_LINE_WIDTH: usize = 60;

fn render_text(results: &[GenerationResult]) -> String {
    let mut out = String::new();
    for (index, result) in results.iter().enumerate() {
        let _ = writeln!(out, "=== Sequence {} ===", index + 1);
        let _ = writeln!(out, "Status: {}", result.termination);
        let _ = writeln!(
            out,
            "Mode: {} (seed {}), backend: {}",
            result.mode, result.seed_used, result.thermo_backend
        );
        let _ = writeln!(
            out,
            "Length: {} / {} (seed {} nt)",
            result.actual_length,
            result.target_length,
            result.initial_sequence.len()
        );
        if let Some(sequence) = &result.sequence {
            let _ = writeln!(out, "Sequence: {sequence}");
        }
        if let Some(metrics) = &result.quality_metrics {
            out.push_str(&render_metrics_text(metrics));
        }
        if let Some(message) = &result.error_message {
            let _ = writeln!(out, "Error: {message}");
        }

        let stats = &result.stats;
        let _ = writeln!(
            out,
            "Search: {} attempts, {} backtracks, {} accepted, {} rejected, depth {}",
            stats.total_attempts,
            stats.backtrack_count,
            stats.accepted,
            stats.rejected,
            stats.max_depth_reached
        );
        if let Some(line) = rollup_line(&stats.window_rollup) {
            let _ = writeln!(out, "Windows: {line}");
        }
        if !stats.rule_failures.is_empty() {
            let failures = stats
                .most_frequent_failures(stats.rule_failures.len())
                .iter()
                .map(|(rule, count)| format!("{rule}={count}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "Rule failures: {failures}");
        }
        let _ = writeln!(out, "Time: {:.3}s", result.generation_time);
        out.push('\n');
    }
    out
}

fn rollup_line(rollup: &WindowRollup) -> Option<String> {
    let mut parts = Vec::new();
    if let (Some(lo), Some(hi)) = (rollup.gc_min, rollup.gc_max) {
        parts.push(format!("GC {:.1}-{:.1}%", lo * 100.0, hi * 100.0));
    }
    if let (Some(lo), Some(hi)) = (rollup.tm_min, rollup.tm_max) {
        parts.push(format!("Tm {lo:.1}-{hi:.1}°C"));
    }
    if let Some(h) = rollup.hairpin_tm_max {
        parts.push(format!("hairpin max {h:.1}°C"));
    }
    if let Some(d) = rollup.homodimer_tm_max {
        parts.push(format!("homodimer max {d:.1}°C"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// One-line batch summary.
#[must_use]
pub fn summary_line(results: &[GenerationResult]) -> String {
    let succeeded = results.iter().filter(|r| r.success).count();
    let seconds: f64 = results.iter().map(|r| r.generation_time).sum();
    format!(
        "Generated {succeeded}/{} sequences successfully in {seconds:.3}s",
        results.len()
    )
}

// =============================================================================
// METRICS
// =============================================================================

/// Render metrics of one analyzed sequence.
pub fn render_metrics(
    sequence: &str,
    metrics: &QualityMetrics,
    format: OutputFormat,
) -> Result<String, SeqforgeError> {
    match format {
        OutputFormat::Json => to_json(metrics),
        OutputFormat::Text | OutputFormat::Fasta => {
            Ok(format!("Sequence: {sequence}\n{}", render_metrics_text(metrics)))
        }
    }
}

fn render_metrics_text(metrics: &QualityMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "GC content: {:.2}%", metrics.gc_content * 100.0);
    let _ = writeln!(out, "Melting temperature: {:.2}°C", metrics.melting_temperature);
    let _ = writeln!(out, "Hairpin Tm: {:.2}°C", metrics.hairpin_tm);
    let _ = writeln!(out, "Homodimer Tm: {:.2}°C", metrics.homodimer_tm);
    let _ = writeln!(out, "Longest homopolymer: {}", metrics.longest_homopolymer);
    let _ = writeln!(
        out,
        "Max dinucleotide repeat: {}",
        metrics.max_dinucleotide_repeat
    );
    let _ = writeln!(
        out,
        "3' GC count: {} ({})",
        metrics.three_prime_gc_count,
        if metrics.three_prime_stable {
            "stable"
        } else {
            "unstable"
        }
    );
    if metrics.is_valid {
        out.push_str("Valid: yes\n");
    } else {
        let violations = metrics
            .violations
            .iter()
            .map(|rule| rule.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Valid: no ({violations})");
    }
    out
}

// =============================================================================
// CSV EXPORT
// =============================================================================

/// Write the sliding-window analysis to `path`.
pub fn write_windows_csv(path: &Path, reports: &[WindowReport]) -> Result<(), SeqforgeError> {
    let file = std::fs::File::create(path).map_err(|e| {
        SeqforgeError::IoError(format!("Cannot create '{}': {e}", path.display()))
    })?;
    write_windows(file, reports)
}

/// Write the sliding-window analysis as CSV to any writer.
pub fn write_windows<W: Write>(writer: W, reports: &[WindowReport]) -> Result<(), SeqforgeError> {
    let mut csv = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| SeqforgeError::SerializationError(e.to_string());

    csv.write_record([
        "window_start",
        "window_end",
        "sequence",
        "gc_content",
        "melting_temperature",
        "hairpin_tm",
        "homodimer_tm",
        "has_homopolymers",
        "has_dinucleotide_repeats",
        "three_prime_gc_count",
        "is_valid",
        "longest_homopolymer",
        "max_dinucleotide_repeat",
    ])
    .map_err(csv_err)?;

    for report in reports {
        let m = &report.metrics;
        csv.write_record([
            report.window_start.to_string(),
            report.window_end.to_string(),
            report.sequence.clone(),
            format!("{:.4}", m.gc_content),
            format!("{:.2}", m.melting_temperature),
            format!("{:.2}", m.hairpin_tm),
            format!("{:.2}", m.homodimer_tm),
            m.has_homopolymers.to_string(),
            m.has_dinucleotide_repeats.to_string(),
            m.three_prime_gc_count.to_string(),
            m.is_valid.to_string(),
            m.longest_homopolymer.to_string(),
            m.max_dinucleotide_repeat.to_string(),
        ])
        .map_err(csv_err)?;
    }
    csv.flush()
        .map_err(|e| SeqforgeError::IoError(e.to_string()))
}
