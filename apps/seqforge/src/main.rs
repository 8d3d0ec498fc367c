//! # seqforge - Constrained DNA Sequence Generator
//!
//! The command-line binary for the seqforge backtracking engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/seqforge (THE BINARY)             │
//! │                                                       │
//! │  ┌─────────────┐    ┌──────────────────────────────┐  │
//! │  │   CLI       │    │   Output                     │  │
//! │  │  (clap)     │───►│  (text / FASTA / JSON / CSV) │  │
//! │  └──────┬──────┘    └──────────────────────────────┘  │
//! │         ▼                                             │
//! │  ┌───────────────┐                                    │
//! │  │ seqforge-core │                                    │
//! │  │ (THE ENGINE)  │                                    │
//! │  └───────────────┘                                    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! seqforge generate --initial CCTGTCATCACGCTAGTAAC --length 200 --profile pcr_friendly
//! seqforge generate -i ATGC -l 100 --mode random --count 5 --format fasta
//! seqforge analyze --sequence ATGCGATCCAGTGCATGGAC
//! seqforge profiles
//! seqforge thermo-status
//! ```

use clap::Parser;
use seqforge::cli;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli::execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; SEQFORGE_LOG_FORMAT=json enables machine-parseable output.
fn init_tracing(verbose: bool, quiet: bool) {
    let log_format = std::env::var("SEQFORGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("seqforge={default_level},seqforge_core={default_level}").into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
