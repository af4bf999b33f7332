//! Decoding resolved content into a generic map.
//!
//! Within each body, blocks are decoded before attributes, and attributes
//! before the check for keys the schema does not declare. Every block type is
//! stored as a list of maps under its plural name when it has one. Each
//! decoded attribute produces a warning describing the conversion, unless
//! conversion warnings are turned off.

use log::{debug, info};
use trellis_core::{
    node::Node,
    schema::{Schema, ValueKind},
    value::{Value, ValueMap},
};

use crate::{
    DEFAULT_MAX_DEPTH,
    content::{Attribute, Content, Resolver},
    error::{Diagnostic, DiagnosticCollector, Diagnostics, ErrorCode, Result},
    syntax::EvalContext,
    trace::{NoopTrace, TraceSink},
};

/// A decoded map and the warnings produced on the way.
#[derive(Debug, Clone, Default)]
pub struct DecodedMap {
    pub map: ValueMap,
    pub warnings: Diagnostics,
}

/// Evaluates resolved content against an [`EvalContext`].
pub struct MapDecoder<'a> {
    ctx: &'a EvalContext,
    resolver: Resolver,
    max_depth: usize,
    conversion_warnings: bool,
    trace: &'a dyn TraceSink,
}

impl<'a> MapDecoder<'a> {
    pub fn new(ctx: &'a EvalContext) -> Self {
        Self {
            ctx,
            resolver: Resolver::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            conversion_warnings: true,
            trace: &NoopTrace,
        }
    }

    /// Limit how deeply blocks and values may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self.resolver = Resolver::new(max_depth);
        self
    }

    pub fn with_conversion_warnings(mut self, enabled: bool) -> Self {
        self.conversion_warnings = enabled;
        self
    }

    pub fn with_trace(mut self, trace: &'a dyn TraceSink) -> Self {
        self.trace = trace;
        self
    }

    /// Resolve `node` against `schema`, then decode it.
    pub fn decode_node(&self, schema: &Schema, node: &Node) -> Result<DecodedMap> {
        self.trace.document(node);
        let content = self.resolver.resolve(schema, node)?;
        self.decode(&content, schema)
    }

    /// Decode already resolved root content.
    ///
    /// On failure, the returned diagnostics hold the warnings emitted before
    /// the error, followed by the error.
    pub fn decode(&self, content: &Content, schema: &Schema) -> Result<DecodedMap> {
        info!(attributes = content.attributes().len(), blocks = content.blocks().len(); "Decoding body");
        let mut collector = DiagnosticCollector::new();

        match self.body(content, schema, 0, &mut collector) {
            Ok(map) => {
                let warnings = collector.finish()?;
                info!(keys = map.len(), warnings = warnings.len(); "Decoded body");
                Ok(DecodedMap { map, warnings })
            }
            Err(err) => Err(collector.fail(err)),
        }
    }

    fn body(
        &self,
        content: &Content,
        schema: &Schema,
        depth: usize,
        collector: &mut DiagnosticCollector,
    ) -> Result<ValueMap> {
        if depth > self.max_depth {
            return Err(Diagnostic::error(format!(
                "blocks nest deeper than {} levels",
                self.max_depth
            ))
            .with_code(ErrorCode::E205)
            .with_subject(content.range().clone())
            .into());
        }

        let mut out = ValueMap::new();
        self.blocks(content, schema, depth, collector, &mut out)?;
        self.attributes(content, schema, collector, &mut out)?;

        if let Some(key) = content.unknown_keys().first() {
            return Err(Diagnostic::error(format!("attribute \"{}\" is redundant", key.name()))
                .with_code(ErrorCode::E304)
                .with_subject(key.range().clone())
                .with_context(content.range().clone())
                .with_detail("the key is not declared in the schema")
                .into());
        }

        Ok(out)
    }

    fn blocks(
        &self,
        content: &Content,
        schema: &Schema,
        depth: usize,
        collector: &mut DiagnosticCollector,
        out: &mut ValueMap,
    ) -> Result<()> {
        for (name, spec) in schema.blocks() {
            let instances: Vec<_> = content.blocks_of(name).collect();
            if instances.is_empty() {
                continue;
            }
            if spec.is_singleton() && instances.len() > 1 {
                return Err(Diagnostic::error(format!(
                    "too many \"{name}\" blocks; singleton requires at most one"
                ))
                .with_code(ErrorCode::E303)
                .with_subject(instances[1].range().clone())
                .into());
            }

            let mut decoded = Vec::with_capacity(instances.len());
            for block in instances {
                let body = self.resolver.resolve_block(spec, block)?;
                let fields = self.body(&body, spec.body(), depth + 1, collector)?;

                let mut map: ValueMap = block
                    .labels()
                    .iter()
                    .map(|label| (label.name().to_string(), Value::from(label.value())))
                    .collect();
                for (key, value) in fields {
                    map.entry(key).or_insert(value);
                }

                let labels = block.label_values();
                debug!(block = name.as_str(), labels:? = labels; "Decoded block");
                self.trace.block(name, &labels);
                decoded.push(Value::Map(map));
            }

            out.insert(spec.result_key(name).to_string(), Value::List(decoded));
        }
        Ok(())
    }

    fn attributes(
        &self,
        content: &Content,
        schema: &Schema,
        collector: &mut DiagnosticCollector,
        out: &mut ValueMap,
    ) -> Result<()> {
        for (name, spec) in schema.attributes() {
            let Some(attribute) = content.attribute(name) else {
                continue;
            };

            let value = self.evaluate(attribute)?;
            let value = coerce(value, spec.kind()).map_err(|value| coercion_error(attribute, &value, spec.kind()))?;

            if self.conversion_warnings {
                collector.emit(
                    Diagnostic::warning(format!(
                        "attribute \"{name}\" = {value}, successfully converted to {}",
                        spec.kind()
                    ))
                    .with_subject(attribute.range())
                    .with_expression(attribute.expression().clone()),
                );
            }

            debug!(attribute = name.as_str(), kind:% = spec.kind(); "Decoded attribute");
            self.trace.attribute(name, &value);
            out.insert(name.clone(), value);
        }
        Ok(())
    }

    /// Evaluate an attribute, attaching its expression to any error.
    fn evaluate(&self, attribute: &Attribute) -> Result<Value> {
        attribute.expression().evaluate(self.ctx).map_err(|errors| {
            Diagnostics::from(
                errors
                    .into_iter()
                    .map(|diagnostic| diagnostic.with_expression(attribute.expression().clone()))
                    .collect::<Vec<_>>(),
            )
        })
    }
}

/// Decode resolved root content with default settings.
///
/// # Example
///
/// ```
/// use trellis_core::schema::{AttributeSpec, Schema};
/// use trellis_parser::{content::resolve, decode::decode_into_map, reader::read_document, syntax::EvalContext};
///
/// let schema = Schema::new().with_attribute("hello", AttributeSpec::string());
/// let doc = read_document("hello: world\n", "example.yaml").unwrap();
/// let content = resolve(&schema, &doc).unwrap();
///
/// let decoded = decode_into_map(&EvalContext::new(), &content, &schema).unwrap();
/// assert_eq!(decoded.map["hello"].as_str(), Some("world"));
/// assert_eq!(decoded.warnings.len(), 1);
/// ```
pub fn decode_into_map(ctx: &EvalContext, content: &Content, schema: &Schema) -> Result<DecodedMap> {
    MapDecoder::new(ctx).decode(content, schema)
}

/// Convert `value` to `kind`, handing the value back when it does not fit.
///
/// Strings accept ints, bools and floats; ints accept numeric strings and
/// whole floats.
pub fn coerce(value: Value, kind: ValueKind) -> std::result::Result<Value, Value> {
    match (kind, value) {
        (ValueKind::String, Value::String(s)) => Ok(Value::String(s)),
        (ValueKind::String, value @ (Value::Int(_) | Value::Bool(_) | Value::Float(_))) => value
            .to_template_string()
            .map(Value::String)
            .ok_or(value),
        (ValueKind::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (ValueKind::Int, Value::Float(f))
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            Ok(Value::Int(f as i64))
        }
        (ValueKind::Int, Value::String(s)) => match s.parse::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Err(Value::String(s)),
        },
        (ValueKind::List, value @ Value::List(_)) | (ValueKind::Map, value @ Value::Map(_)) => Ok(value),
        (_, value) => Err(value),
    }
}

fn coercion_error(attribute: &Attribute, value: &Value, kind: ValueKind) -> Diagnostics {
    let name = attribute.name();
    let diagnostic = if value.is_null() {
        Diagnostic::error(format!("attribute \"{name}\" is null, expected {kind}")).with_code(ErrorCode::E501)
    } else {
        Diagnostic::error(format!(
            "attribute \"{name}\" is a {}, expected {kind}",
            value.value_type()
        ))
        .with_code(ErrorCode::E500)
        .with_detail(format!("the value is {value}"))
    };
    diagnostic
        .with_subject(attribute.expression().range().clone())
        .with_context(attribute.range())
        .with_expression(attribute.expression().clone())
        .into()
}
