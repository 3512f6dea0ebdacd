//! Plugin manifest parsing
//!
//! Every packaged plugin carries a `plugin.toml` at its root describing
//! the plugin. The backend uses it to place unpacked archives and to
//! reject archives whose contents do not match the requested install.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeriscanError};
use crate::plugin::types::CURRENT_API_GENERATION;

pub const PLUGIN_MANIFEST_FILE: &str = "plugin.toml";

/// Plugin manifest (plugin.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (required)
    pub name: String,

    /// Plugin version (required for packaged plugins)
    pub version: String,

    /// Plugin API generation this plugin targets
    #[serde(default = "default_api_generation")]
    pub api_generation: u32,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Authors
    #[serde(default)]
    pub authors: Vec<String>,

    /// License
    #[serde(default)]
    pub license: Option<String>,
}

fn default_api_generation() -> u32 {
    CURRENT_API_GENERATION
}

impl PluginManifest {
    /// Load plugin.toml from a plugin root directory
    pub fn load(plugin_dir: &Path) -> Result<Self> {
        let path = plugin_dir.join(PLUGIN_MANIFEST_FILE);
        if !path.exists() {
            return Err(VeriscanError::ManifestParse {
                path,
                message: "manifest file not found".to_string(),
            });
        }

        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| VeriscanError::ManifestParse {
            path,
            message: e.to_string(),
        })
    }

    /// Parse a manifest from a string
    pub fn parse_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VeriscanError::ManifestParse {
            path: PLUGIN_MANIFEST_FILE.into(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = PluginManifest::parse_str(
            r#"
            name = "veriscan-aws"
            version = "0.7.1"
            api_generation = 2
            description = "AWS resource checks"
            authors = ["Ada"]
            "#,
        )
        .unwrap();

        assert_eq!(manifest.name, "veriscan-aws");
        assert_eq!(manifest.version, "0.7.1");
        assert_eq!(manifest.api_generation, 2);
        assert_eq!(manifest.description.as_deref(), Some("AWS resource checks"));
    }

    #[test]
    fn test_api_generation_defaults() {
        let manifest = PluginManifest::parse_str(
            r#"
            name = "probe-winrm"
            version = "1.0.0"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.api_generation, CURRENT_API_GENERATION);
        assert!(manifest.authors.is_empty());
    }

    #[test]
    fn test_missing_name_is_an_error() {
        assert!(PluginManifest::parse_str(r#"version = "1.0.0""#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PluginManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, VeriscanError::ManifestParse { .. }));
    }
}
