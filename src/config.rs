//! Inflater Configuration
//!
//! Tunables for the whole pipeline, loadable from TOML:
//!
//! ```toml
//! hot_capacity = 50
//! chunk_size = 8192
//! search_prefixes = ["android.widget.", "android.view.", "android.webkit."]
//! fail_fast = false
//! cache_dir = "/var/cache/layouts"
//! density = 2.0
//! ```
//!
//! Every key is optional.

use crate::error::ConfigError;
use crate::reader::buffered::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default hot tier capacity
pub const DEFAULT_HOT_CAPACITY: usize = 50;

/// Package prefixes tried, in order, for a bare type name
pub const DEFAULT_SEARCH_PREFIXES: [&str; 3] = ["android.widget.", "android.view.", "android.webkit."];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InflaterConfig {
    /// Entries kept in the hot (LRU) cache tier
    #[serde(default = "default_hot_capacity")]
    pub hot_capacity: usize,

    /// Bytes read from a source per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Prefixes tried when resolving a type name without a `.`
    #[serde(default = "default_search_prefixes")]
    pub search_prefixes: Vec<String>,

    /// Abort a node's attributes at the first failure instead of collecting
    #[serde(default)]
    pub fail_fast: bool,

    /// Directory for the permanent cache tier; in memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Pixels per dp, used when converting dimensions
    #[serde(default = "default_density")]
    pub density: f32,
}

fn default_hot_capacity() -> usize {
    DEFAULT_HOT_CAPACITY
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_search_prefixes() -> Vec<String> {
    DEFAULT_SEARCH_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_density() -> f32 {
    1.0
}

impl Default for InflaterConfig {
    fn default() -> Self {
        InflaterConfig {
            hot_capacity: default_hot_capacity(),
            chunk_size: default_chunk_size(),
            search_prefixes: default_search_prefixes(),
            fail_fast: false,
            cache_dir: None,
            density: default_density(),
        }
    }
}

impl InflaterConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: InflaterConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hot_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "hot_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::Invalid {
                key: "chunk_size",
                reason: format!("must be at least {}", MIN_CHUNK_SIZE),
            });
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ConfigError::Invalid {
                key: "density",
                reason: format!("must be a positive number, got {}", self.density),
            });
        }
        if let Some(prefix) = self.search_prefixes.iter().find(|p| !p.ends_with('.')) {
            return Err(ConfigError::Invalid {
                key: "search_prefixes",
                reason: format!("prefix {:?} must end with '.'", prefix),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(InflaterConfig::from_toml_str("").unwrap(), InflaterConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = InflaterConfig::from_toml_str(
            r#"
            hot_capacity = 8
            fail_fast = true
            cache_dir = "/tmp/layouts"
            search_prefixes = ["com.example.widgets."]
            "#,
        )
        .unwrap();
        assert_eq!(config.hot_capacity, 8);
        assert!(config.fail_fast);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/layouts")));
        assert_eq!(config.search_prefixes, ["com.example.widgets."]);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = InflaterConfig::from_toml_str("hot_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "hot_capacity", .. }));
        let err = InflaterConfig::from_toml_str("chunk_size = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "chunk_size", .. }));
        let err = InflaterConfig::from_toml_str("search_prefixes = [\"android.widget\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "search_prefixes", .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            InflaterConfig::from_toml_str("hot_capcity = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = InflaterConfig {
            density: 2.5,
            ..InflaterConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(InflaterConfig::from_toml_str(&text).unwrap(), config);
    }
}
