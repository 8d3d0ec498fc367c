//! # seqforge
//!
//! Command-line front end for seqforge-core.
//!
//! The binary lives in `main.rs`; the modules are exposed here so integration
//! tests can drive the renderers directly.

pub mod cli;
pub mod output;
