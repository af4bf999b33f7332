//! Configuration and schema file loading for the CLI
//!
//! This module finds and loads the TOML configuration file from various
//! locations (explicit path, local directory, system directory), and loads
//! the TOML schema a document is decoded against.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::de::DeserializeOwned;
use thiserror::Error;

use trellis::{TrellisError, config::DecodeConfig, schema::Schema};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for TrellisError {
    fn from(err: ConfigError) -> Self {
        TrellisError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (trellis/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path to config file
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<DecodeConfig, TrellisError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_toml_file(path);
    }

    let local_config = Path::new("trellis/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_toml_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "trellis", "trellis") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_toml_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(DecodeConfig::default())
}

/// Load a schema from a TOML file.
///
/// Attributes and blocks keep the order they are declared in.
///
/// # Errors
///
/// Returns error if the file doesn't exist, cannot be read, or is not a
/// valid schema.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema, TrellisError> {
    let path = path.as_ref();
    let schema: Schema = load_toml_file(path)?;
    debug!(
        path = path.display().to_string(),
        attributes = schema.attributes().len(),
        blocks = schema.blocks().len();
        "Schema loaded"
    );
    Ok(schema)
}

fn load_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, TrellisError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;

    let value = toml::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_explicit_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_depth = 8\nconversion_warnings = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, DecodeConfig::new(8, false));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "conversion_warnings = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.max_depth(), DecodeConfig::default().max_depth());
        assert!(!config.conversion_warnings());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, TrellisError::Config(_)));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_depth = \"deep\"\n").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(TrellisError::Config(_))));
    }

    #[test]
    fn test_load_schema_keeps_declaration_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        fs::write(
            &path,
            "[attributes.zeta]\nkind = \"string\"\n\n[attributes.alpha]\nkind = \"int\"\n",
        )
        .unwrap();

        let schema = load_schema(&path).unwrap();
        let names: Vec<_> = schema.attributes().keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
