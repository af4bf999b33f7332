//! CLI logic for the Trellis decoder.
//!
//! This module contains the core CLI logic: load the configuration and the
//! schema, decode the input document, and write the result as JSON.

pub mod error_adapter;

mod args;
mod config;
mod vars;

pub use args::Args;

use std::fs;

use log::{info, warn};

use trellis::{Decoder, TrellisError};

/// Run the Trellis CLI application
///
/// This function decodes the input document against the schema and writes
/// the resulting map as pretty-printed JSON to the output file, or to
/// stdout when no output file is given. Warnings are logged.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - File I/O errors
/// - Configuration, schema or variable errors
/// - Decode errors
pub fn run(args: &Args) -> Result<(), TrellisError> {
    info!(
        input_path = args.input,
        schema_path = args.schema;
        "Processing document"
    );

    let config = config::load_config(args.config.as_ref())?;
    let schema = config::load_schema(&args.schema)?;
    let ctx = vars::build_context(&args.vars)?;

    let source = fs::read_to_string(&args.input)?;

    let decoder = Decoder::new(schema).with_config(config);
    let decoded = decoder.decode_str(&source, &args.input, &ctx)?;

    for warning in decoded.warnings() {
        warn!("{warning}");
    }

    let json = serde_json::to_string_pretty(&decoded.value)?;
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))?;
            info!(output_file = path; "Decoded map written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
