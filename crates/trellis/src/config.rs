//! Configuration for decoding.
//!
//! [`DecodeConfig`] implements [`serde::Deserialize`] with every field
//! defaulted, so it can be loaded from a partial configuration file.
//!
//! # Example
//!
//! ```
//! # use trellis::config::DecodeConfig;
//! let config = DecodeConfig::default();
//! assert_eq!(config.max_depth(), 64);
//! assert!(config.conversion_warnings());
//! ```

use serde::Deserialize;

use trellis_parser::DEFAULT_MAX_DEPTH;

/// Settings that control a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DecodeConfig {
    /// Maximum nesting depth of documents, values and blocks.
    #[serde(default = "default_max_depth")]
    max_depth: usize,

    /// Whether every decoded attribute produces a conversion warning.
    #[serde(default = "default_conversion_warnings")]
    conversion_warnings: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_conversion_warnings() -> bool {
    true
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            conversion_warnings: default_conversion_warnings(),
        }
    }
}

impl DecodeConfig {
    /// Creates a new [`DecodeConfig`].
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Maximum nesting depth before decoding fails.
    /// * `conversion_warnings` - Emit a warning for every decoded attribute.
    pub fn new(max_depth: usize, conversion_warnings: bool) -> Self {
        Self {
            max_depth,
            conversion_warnings,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_conversion_warnings(mut self, enabled: bool) -> Self {
        self.conversion_warnings = enabled;
        self
    }

    /// Returns the maximum nesting depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns whether conversion warnings are emitted.
    pub fn conversion_warnings(&self) -> bool {
        self.conversion_warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DecodeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecodeConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config: DecodeConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth(), 8);
        assert!(config.conversion_warnings());

        let config: DecodeConfig =
            serde_json::from_str(r#"{"conversion_warnings": false}"#).unwrap();
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
        assert!(!config.conversion_warnings());
    }

    #[test]
    fn test_builder_methods() {
        let config = DecodeConfig::default()
            .with_max_depth(3)
            .with_conversion_warnings(false);
        assert_eq!(config, DecodeConfig::new(3, false));
    }
}
