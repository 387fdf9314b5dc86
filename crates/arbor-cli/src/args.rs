//! Command-line argument definitions for the Arbor CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, output format,
//! configuration file selection, the engine timeout, and logging verbosity.

use clap::Parser;

use arbor::render::OutputFormat;

/// Command-line arguments for the Arbor diagram tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input diagram declaration (TOML)
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to the output file; named after the diagram title when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (png, svg, pdf, jpg, dot); inferred from the output
    /// extension when omitted
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Seconds to wait for the layout engine before killing it
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write the DOT description instead of running the layout engine
    #[arg(long)]
    pub emit_dot: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
