use proptest::prelude::*;
use trellis_core::{
    schema::{AttributeSpec, BlockSpec, Schema},
    value::{Value, ValueMap},
};
use trellis_parser::{
    decode_str,
    error::{Diagnostics, ErrorCode},
    syntax::EvalContext,
};

fn context() -> EvalContext {
    let var: Value = [("one", Value::from("ONE"))].into_iter().collect();
    EvalContext::new().with_variable("var", var).with_stdlib()
}

fn decode(source: &str, schema: &Schema) -> Result<ValueMap, Diagnostics> {
    decode_str(source, "example.yaml", schema, &context()).map(|decoded| decoded.map)
}

fn string_map(pairs: &[(&str, &str)]) -> Value {
    pairs
        .iter()
        .map(|(k, v)| (*k, Value::from(*v)))
        .collect()
}

#[test]
fn test_blocks_labels_and_templates() {
    let source = r#"
foo:
- fooFirstLabel: bar
  baz: BAZ

hoge:
  fuga: FUGA

hello: "x${var.one}y"

intval: 1
"#;
    let schema = Schema::new()
        .with_attribute("hello", AttributeSpec::string())
        .with_attribute("intval", AttributeSpec::int())
        .with_block(
            "foo",
            BlockSpec::new()
                .with_plural("foos")
                .with_label("fooFirstLabel")
                .with_attribute("baz", AttributeSpec::string()),
        )
        .with_block("hoge", BlockSpec::new().with_attribute("fuga", AttributeSpec::string()));

    let map = decode(source, &schema).expect("Failed to decode");

    assert_eq!(map["hello"], Value::from("xONEy"));
    assert_eq!(map["intval"], Value::Int(1));
    assert_eq!(
        map["foos"],
        Value::List(vec![string_map(&[("fooFirstLabel", "bar"), ("baz", "BAZ")])])
    );
    assert_eq!(map["hoge"], Value::List(vec![string_map(&[("fuga", "FUGA")])]));
}

#[test]
fn test_expression_attributes() {
    let source = r#"
ary1:
- a: "x${var.one}y"

ary2: !!exp list(map("a", "x${var.one}y"))

map1:
  foo: "x${var.one}y"

map2: !!exp map("foo", "x${var.one}y")

str1: "x${var.one}y"

int1: !!exp 1 + 2
"#;
    let schema = Schema::new()
        .with_attribute("ary1", AttributeSpec::list())
        .with_attribute("ary2", AttributeSpec::list())
        .with_attribute("map1", AttributeSpec::map())
        .with_attribute("map2", AttributeSpec::map())
        .with_attribute("str1", AttributeSpec::string())
        .with_attribute("int1", AttributeSpec::int());

    let map = decode(source, &schema).expect("Failed to decode");

    let list_of_maps = Value::List(vec![string_map(&[("a", "xONEy")])]);
    assert_eq!(map["ary1"], list_of_maps);
    assert_eq!(map["ary2"], list_of_maps);
    assert_eq!(map["map1"], string_map(&[("foo", "xONEy")]));
    assert_eq!(map["map2"], string_map(&[("foo", "xONEy")]));
    assert_eq!(map["str1"], Value::from("xONEy"));
    assert_eq!(map["int1"], Value::Int(3));
}

#[test]
fn test_errors_point_into_the_document() {
    let schema = Schema::new().with_attribute("hello", AttributeSpec::string());

    let err = decode("hello: world\nextra: 1\n", &schema).unwrap_err();
    let diag = err.first_error().expect("an error");
    assert_eq!(diag.code(), Some(ErrorCode::E304));
    assert!(diag.summary().contains("redundant"));
    assert!(diag.summary().contains("extra"));
    let subject = diag.subject().expect("a subject");
    assert_eq!(subject.filename(), "example.yaml");
    assert_eq!((subject.start().line(), subject.start().column()), (2, 1));

    let err = decode("hello: ${var.two}\n", &schema).unwrap_err();
    let diag = err.first_error().expect("an error");
    assert_eq!(diag.code(), Some(ErrorCode::E401));
    let subject = diag.subject().expect("a subject");
    assert_eq!((subject.start().line(), subject.start().column()), (1, 10));
    assert_eq!(subject.end().column(), 17);

    let err = decode("hello: \"unterminated\n", &schema).unwrap_err();
    assert_eq!(err.first_error().and_then(|d| d.code()), Some(ErrorCode::E001));
}

#[test]
fn test_missing_required_attribute_names_it() {
    let schema = Schema::new()
        .with_attribute("hello", AttributeSpec::string())
        .with_attribute("port", AttributeSpec::int());

    let err = decode("hello: world\n", &schema).unwrap_err();
    let diag = err.first_error().expect("an error");
    assert_eq!(diag.code(), Some(ErrorCode::E300));
    assert!(diag.summary().contains("\"port\""));
}

#[test]
fn test_nested_blocks() {
    let source = r#"
service:
  - name: api
    port: 8080
    route:
      - path: /health
      - path: /v1
  - name: worker
    port: 9090
"#;
    let route = BlockSpec::new()
        .with_plural("routes")
        .with_optional(true)
        .with_attribute("path", AttributeSpec::string());
    let schema = Schema::new().with_block(
        "service",
        BlockSpec::new()
            .with_label("name")
            .with_attribute("port", AttributeSpec::int())
            .with_block("route", route),
    );

    let map = decode(source, &schema).expect("Failed to decode");
    let services = map["service"].as_list().expect("a list");
    assert_eq!(services.len(), 2);

    let api = services[0].as_map().expect("a map");
    assert_eq!(api["name"], Value::from("api"));
    assert_eq!(api["port"], Value::Int(8080));
    let paths: Vec<_> = api["routes"]
        .as_list()
        .expect("a list")
        .iter()
        .map(|route| route.as_map().expect("a map")["path"].clone())
        .collect();
    assert_eq!(paths, [Value::from("/health"), Value::from("/v1")]);

    let worker = services[1].as_map().expect("a map");
    assert!(!worker.contains_key("routes"));
}

#[test]
fn test_flow_block_scalar_and_alias_values() {
    let source = r#"
hello: &greeting "x${var.one}y"
again: *greeting
intval: !!exp |
  1 +
    2
tags: [a, "b c"]
foo: [{fooFirstLabel: bar, baz: BAZ}]
"#;
    let schema = Schema::new()
        .with_attribute("hello", AttributeSpec::string())
        .with_attribute("again", AttributeSpec::string())
        .with_attribute("intval", AttributeSpec::int())
        .with_attribute("tags", AttributeSpec::list())
        .with_block(
            "foo",
            BlockSpec::new()
                .with_label("fooFirstLabel")
                .with_attribute("baz", AttributeSpec::string()),
        );

    let map = decode(source, &schema).expect("Failed to decode");

    assert_eq!(map["hello"], Value::from("xONEy"));
    assert_eq!(map["again"], Value::from("xONEy"));
    assert_eq!(map["intval"], Value::Int(3));
    assert_eq!(map["tags"], Value::List(vec![Value::from("a"), Value::from("b c")]));
    assert_eq!(
        map["foo"],
        Value::List(vec![string_map(&[("fooFirstLabel", "bar"), ("baz", "BAZ")])])
    );
}

#[test]
fn test_unknown_alias_is_read_error() {
    let schema = Schema::new().with_attribute("hello", AttributeSpec::string());
    let err = decode("hello: *nowhere\n", &schema).unwrap_err();
    assert_eq!(err.first_error().and_then(|d| d.code()), Some(ErrorCode::E006));
}

proptest! {
    /// Attribute-only documents without expressions decode to exactly the
    /// scalars they were written with.
    #[test]
    fn test_plain_documents_round_trip(
        strings in prop::collection::btree_map("s[a-z0-9_]{0,8}", "[a-zA-Z0-9 .,_-]{0,16}", 0..6),
        ints in prop::collection::btree_map("i[a-z0-9_]{0,8}", any::<i32>(), 0..6),
    ) {
        let mut schema = Schema::new();
        let mut source = String::new();
        for (key, value) in &strings {
            schema = schema.with_attribute(key.as_str(), AttributeSpec::string());
            source.push_str(&format!("{key}: \"{value}\"\n"));
        }
        for (key, value) in &ints {
            schema = schema.with_attribute(key.as_str(), AttributeSpec::int());
            source.push_str(&format!("{key}: {value}\n"));
        }

        let map = decode(&source, &schema).expect("Failed to decode");
        prop_assert_eq!(map.len(), strings.len() + ints.len());
        for (key, value) in &strings {
            prop_assert_eq!(&map[key.as_str()], &Value::from(value.as_str()));
        }
        for (key, value) in &ints {
            prop_assert_eq!(&map[key.as_str()], &Value::Int(i64::from(*value)));
        }
    }
}
