use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

use trellis_cli::{Args, run};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Collects all .yaml files from a directory
fn collect_yaml_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yaml")
            })
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn args(input: &Path, output: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        schema: fixtures().join("schema.toml").to_string_lossy().to_string(),
        vars: vec!["var.one=ONE".to_string()],
        config: None,
        output: Some(output.to_string_lossy().to_string()),
        log_level: "off".to_string(),
    }
}

fn output_path(dir: &Path, input: &Path) -> PathBuf {
    dir.join(format!(
        "{}.json",
        input.file_stem().unwrap().to_string_lossy()
    ))
}

#[test]
fn e2e_smoke_test_valid_fixtures() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let valid_fixtures = collect_yaml_files(fixtures().join("valid"));

    assert!(
        !valid_fixtures.is_empty(),
        "No valid fixtures found in tests/fixtures/valid/"
    );

    let mut failed = Vec::new();

    for fixture in &valid_fixtures {
        let output = output_path(temp_dir.path(), fixture);

        match run(&args(fixture, &output)) {
            Ok(()) => {
                let json = fs::read_to_string(&output).expect("Failed to read output");
                serde_json::from_str::<serde_json::Value>(&json).expect("Output should be JSON");
            }
            Err(e) => failed.push((fixture.clone(), e)),
        }
    }

    if !failed.is_empty() {
        eprintln!("\nValid fixtures that failed:");
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} valid fixture(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_smoke_test_error_fixtures() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let error_fixtures = collect_yaml_files(fixtures().join("errors"));

    assert!(
        !error_fixtures.is_empty(),
        "No error fixtures found in tests/fixtures/errors/"
    );

    let mut unexpectedly_succeeded = Vec::new();

    for fixture in &error_fixtures {
        let output = output_path(temp_dir.path(), fixture);

        if run(&args(fixture, &output)).is_ok() {
            unexpectedly_succeeded.push(fixture.clone());
        }
        assert!(!output.exists(), "No output expected for {}", fixture.display());
    }

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError fixtures that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error fixture(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }
}

#[test]
fn e2e_blocks_output() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures().join("valid").join("blocks.yaml");
    let output = temp_dir.path().join("blocks.json");

    run(&args(&input, &output)).expect("Failed to run");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "foos": [{"fooFirstLabel": "bar", "baz": "BAZ"}],
            "hoge": [{"fuga": "FUGA"}],
            "hello": "xONEy",
            "intval": 1,
        })
    );
}

#[test]
fn e2e_expressions_output() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures().join("valid").join("expressions.yaml");
    let output = temp_dir.path().join("expressions.json");

    run(&args(&input, &output)).expect("Failed to run");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["hello"], "yes");
    assert_eq!(json["intval"], 30);
    assert_eq!(json["tags"], serde_json::json!(["a", "b", "c"]));
    assert_eq!(json["foos"][0]["baz"], "one");
    assert_eq!(json["foos"][1]["fooFirstLabel"], "second");
    assert_eq!(json["foos"][1]["baz"], "literal ${var.one}");
}

#[test]
fn e2e_decode_error_is_reported_with_source() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures().join("errors").join("redundant.yaml");
    let output = temp_dir.path().join("redundant.json");

    let err = run(&args(&input, &output)).unwrap_err();
    let reportables = trellis_cli::error_adapter::to_reportables(&err);

    let mut rendered = String::new();
    miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor())
        .render_report(&mut rendered, reportables.last().unwrap())
        .unwrap();
    assert!(rendered.contains("E304"));
    assert!(rendered.contains("redundant"));
    assert!(rendered.contains("extra: value"));
}

#[test]
fn e2e_missing_schema_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = fixtures().join("valid").join("minimal.yaml");
    let mut args = args(&input, &temp_dir.path().join("out.json"));
    args.schema = temp_dir.path().join("absent.toml").to_string_lossy().to_string();

    assert!(matches!(run(&args), Err(trellis::TrellisError::Config(_))));
}
