use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeriscanError};

const CONFIG_FILE: &str = "config.toml";

/// Package index used when config.toml does not name one
pub const DEFAULT_INDEX_URL: &str = "https://index.veriscan.dev";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# veriscan configuration file
# Location: ~/.veriscan/config.toml

[index]
# Package index queried for plugin search, install, and update.
# Default: https://index.veriscan.dev
url = "https://index.veriscan.dev"
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
}

/// Package-index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the package index
    #[serde(default = "default_index_url")]
    pub url: String,
}

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
        }
    }
}

impl Config {
    /// Load config from the base directory; a missing file is defaults
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| VeriscanError::ConfigParse {
            path,
            message: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Write the commented default template if no config exists yet
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.index.url, DEFAULT_INDEX_URL);
    }

    #[test]
    fn test_load_custom_index_url() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "[index]\nurl = \"https://mirror.example.com\"\n",
        )
        .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.index.url, "https://mirror.example.com");
    }

    #[test]
    fn test_init_writes_template_once() {
        let temp = TempDir::new().unwrap();
        let path = Config::init(temp.path()).unwrap();
        assert!(path.exists());

        // a second init leaves the file alone
        std::fs::write(&path, "[index]\nurl = \"https://kept.example.com\"\n").unwrap();
        Config::init(temp.path()).unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.index.url, "https://kept.example.com");
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "not valid toml [").unwrap();

        let err = Config::load(temp.path()).unwrap_err();
        assert!(matches!(err, VeriscanError::ConfigParse { .. }));
    }
}
