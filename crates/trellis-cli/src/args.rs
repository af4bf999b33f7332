//! Command-line argument definitions for the Trellis CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the document and schema, supply
//! variables, and control output, configuration and logging.

use clap::Parser;

/// Command-line arguments for the Trellis decoder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input document
    #[arg(help = "Path to the input YAML document")]
    pub input: String,

    /// Path to the schema file (TOML)
    #[arg(short, long)]
    pub schema: String,

    /// Variable made available to expressions, as `name=value` or `name.key=value`
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the output JSON file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
