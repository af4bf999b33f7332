//! Trellis - schema-driven decoding of YAML documents.
//!
//! Documents are read into a tagged node tree, matched against a declarative
//! schema, and decoded into generic maps. Attribute values may embed `${...}`
//! templates and `!!exp` expressions, which are evaluated against an
//! [`EvalContext`] of variables and functions.

pub mod config;
pub mod projection;

mod error;

pub use trellis_core::{node, position, schema, value};
pub use trellis_parser::{
    error::{Diagnostic, Diagnostics, ErrorCode, Severity},
    syntax::{self, EvalContext, Function, FunctionError},
    trace::{NoopTrace, TraceSink},
};

pub use error::TrellisError;

use std::sync::Arc;

use log::{debug, info, trace};
use serde::de::DeserializeOwned;

use trellis_core::{node::Node, schema::Schema, value::ValueMap};
use trellis_parser::{decode::MapDecoder, reader::Reader};

use config::DecodeConfig;

/// A decoded value together with the warnings produced while decoding it.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Decoded<T> {
    /// Returns the warnings produced while decoding.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.warnings()
    }

    /// Transforms the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

/// Builder for decoding documents against a schema.
///
/// # Examples
///
/// ```rust
/// use trellis::{
///     Decoder, EvalContext,
///     config::DecodeConfig,
///     schema::{AttributeSpec, Schema},
///     value::Value,
/// };
///
/// let schema = Schema::new().with_attribute("hello", AttributeSpec::string());
/// let ctx = EvalContext::new().with_variable("name", "world");
///
/// let decoder = Decoder::new(schema).with_config(DecodeConfig::default());
/// let decoded = decoder
///     .decode_str("hello: ${name}\n", "inline.yaml", &ctx)
///     .expect("Failed to decode");
///
/// assert_eq!(decoded.value["hello"], Value::from("world"));
/// ```
#[derive(Clone)]
pub struct Decoder {
    schema: Schema,
    config: DecodeConfig,
    trace: Arc<dyn TraceSink>,
}

impl Decoder {
    /// Create a new decoder for `schema` with the default configuration.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            config: DecodeConfig::default(),
            trace: Arc::new(NoopTrace),
        }
    }

    pub fn with_config(mut self, config: DecodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a sink that observes the document tree and decoded values.
    pub fn with_trace(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Read `source` and decode it into a map.
    ///
    /// # Arguments
    ///
    /// * `source` - Document text
    /// * `filename` - Name recorded in every position of the document
    /// * `ctx` - Variables and functions available to expressions
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Decode`] carrying `source` when the document
    /// cannot be read, does not match the schema, or an expression fails.
    pub fn decode_str(
        &self,
        source: &str,
        filename: &str,
        ctx: &EvalContext,
    ) -> Result<Decoded<ValueMap>, TrellisError> {
        info!(filename, max_depth = self.config.max_depth(); "Decoding document");

        let node = Reader::new(filename)
            .with_max_depth(self.config.max_depth())
            .read(source)
            .map_err(|diagnostics| TrellisError::new_decode_error(diagnostics, source))?;
        debug!(filename; "Document read");

        self.decode(&node, ctx)
            .map_err(|diagnostics| TrellisError::new_decode_error(diagnostics, source))
    }

    /// Decode an already loaded document tree into a map.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Decode`] with empty source text on failure.
    pub fn decode_node(
        &self,
        node: &Node,
        ctx: &EvalContext,
    ) -> Result<Decoded<ValueMap>, TrellisError> {
        info!(kind:% = node.kind(); "Decoding node");
        self.decode(node, ctx)
            .map_err(|diagnostics| TrellisError::new_decode_error(diagnostics, String::new()))
    }

    /// Read `source`, decode it, and project the result onto `T`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Decode`] as [`Decoder::decode_str`] does, or
    /// [`TrellisError::Projection`] when the map does not fit `T`.
    pub fn decode_into<T: DeserializeOwned>(
        &self,
        source: &str,
        filename: &str,
        ctx: &EvalContext,
    ) -> Result<Decoded<T>, TrellisError> {
        let decoded = self.decode_str(source, filename, ctx)?;
        let value = projection::project(&decoded.value)?;
        Ok(Decoded {
            value,
            diagnostics: decoded.diagnostics,
        })
    }

    fn decode(&self, node: &Node, ctx: &EvalContext) -> Result<Decoded<ValueMap>, Diagnostics> {
        let decoded = MapDecoder::new(ctx)
            .with_max_depth(self.config.max_depth())
            .with_conversion_warnings(self.config.conversion_warnings())
            .with_trace(self.trace.as_ref())
            .decode_node(&self.schema, node)?;

        info!(
            entries = decoded.map.len(),
            warnings = decoded.warnings.len();
            "Document decoded"
        );
        trace!(map:? = decoded.map; "Decoded map");

        Ok(Decoded {
            value: decoded.map,
            diagnostics: decoded.warnings,
        })
    }
}
