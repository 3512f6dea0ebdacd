//! Installed-plugin registry
//!
//! File-backed mapping from plugin name to its installed record,
//! persisted as plugins.json in the veriscan base directory. Loaded on
//! open, saved after every mutation; keys are unique, so the registry
//! holds at most one record per name by construction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeriscanError};
use crate::plugin::types::PluginRecord;

const REGISTRY_FILE: &str = "plugins.json";

/// plugins.json structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    /// File format version
    pub version: u32,
    /// Plugins map: name -> record
    pub plugins: BTreeMap<String, PluginRecord>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: 1,
            plugins: BTreeMap::new(),
        }
    }
}

/// Plugin Registry - the host's view of what is installed
pub struct PluginRegistry {
    /// Base directory (~/.veriscan)
    base_dir: PathBuf,
}

impl PluginRegistry {
    /// Create a registry rooted at the user's home directory
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or(VeriscanError::HomeNotFound)?;
        Ok(Self {
            base_dir: home.join(".veriscan"),
        })
    }

    /// Create with a custom base directory (for testing)
    pub fn with_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// The registry's base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the backing file
    pub fn registry_path(&self) -> PathBuf {
        self.base_dir.join(REGISTRY_FILE)
    }

    /// Load plugins.json; a missing file is an empty registry
    pub fn load(&self) -> Result<RegistryFile> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(RegistryFile::default());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| VeriscanError::RegistryParse {
            path,
            message: e.to_string(),
        })
    }

    /// Save plugins.json
    pub fn save(&self, file: &RegistryFile) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        let path = self.registry_path();
        let content =
            serde_json::to_string_pretty(file).map_err(|e| VeriscanError::RegistryParse {
                path: path.clone(),
                message: e.to_string(),
            })?;

        fs::write(&path, content)?;
        Ok(())
    }

    /// Get a plugin record by name
    pub fn get(&self, name: &str) -> Result<Option<PluginRecord>> {
        Ok(self.load()?.plugins.get(name).cloned())
    }

    /// All plugin records
    pub fn statuses(&self) -> Result<Vec<PluginRecord>> {
        Ok(self.load()?.plugins.into_values().collect())
    }

    /// Insert or replace the record for a plugin name
    pub fn upsert(&self, record: PluginRecord) -> Result<()> {
        let mut file = self.load()?;
        file.plugins.insert(record.name.clone(), record);
        self.save(&file)
    }

    /// Remove a plugin record, returning it if present
    pub fn remove(&self, name: &str) -> Result<Option<PluginRecord>> {
        let mut file = self.load()?;
        let removed = file.plugins.remove(name);
        if removed.is_some() {
            self.save(&file)?;
        }
        Ok(removed)
    }
}
