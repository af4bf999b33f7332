//! # Trellis Parser
//!
//! Reads documents, resolves them against a schema, and decodes them into
//! generic maps, evaluating embedded expressions along the way.
//!
//! The pipeline:
//!
//! 1. **Read** - Turn source text into a tagged node tree ([`reader`])
//! 2. **Resolve** - Match the tree against a schema ([`content`])
//! 3. **Build** - Turn attribute values into expressions ([`expression`], [`syntax`])
//! 4. **Decode** - Evaluate and coerce into a map ([`decode`])
//!
//! ## Usage
//!
//! ```
//! # use trellis_core::{schema::{AttributeSpec, Schema}, value::Value};
//! # use trellis_parser::{decode_str, error::Diagnostics, syntax::EvalContext};
//!
//! fn main() -> Result<(), Diagnostics> {
//!     let schema = Schema::new().with_attribute("greeting", AttributeSpec::string());
//!     let ctx = EvalContext::new().with_variable("name", "world");
//!
//!     let decoded = decode_str("greeting: hello ${name}\n", "inline.yaml", &schema, &ctx)?;
//!     assert_eq!(decoded.map["greeting"], Value::from("hello world"));
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod decode;
pub mod error;
pub mod expression;
pub mod reader;
pub mod syntax;
pub mod trace;

use log::info;
use trellis_core::schema::Schema;

use decode::{DecodedMap, MapDecoder};
use error::Result;
use syntax::EvalContext;

/// How deeply documents, values and blocks may nest by default.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Read `source` and decode it against `schema` with default settings.
///
/// The returned map holds the decoded values; warnings produced while
/// decoding are returned next to it.
pub fn decode_str(source: &str, filename: &str, schema: &Schema, ctx: &EvalContext) -> Result<DecodedMap> {
    info!(filename; "Decoding document");
    let document = reader::read_document(source, filename)?;
    MapDecoder::new(ctx).decode_node(schema, &document)
}
