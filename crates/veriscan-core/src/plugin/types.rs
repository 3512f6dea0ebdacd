//! Plugin type definitions
//!
//! Records for installed plugins, search results, and the three-way
//! outcome returned by every lifecycle operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::VeriscanError;

/// API generation recorded for plugins installed by this host build.
pub const CURRENT_API_GENERATION: u32 = 2;

/// How an installed plugin got onto the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallType {
    /// Shipped with the host
    Core,
    /// Shipped as a host dependency
    Bundle,
    /// Installed from the package index (or a local package archive)
    Remote,
    /// Local source reference, used for plugin development
    Path,
}

impl std::fmt::Display for InstallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Bundle => write!(f, "bundle"),
            Self::Remote => write!(f, "remote"),
            Self::Path => write!(f, "path"),
        }
    }
}

/// One installed plugin, as persisted in plugins.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Plugin name (unique key in the registry)
    pub name: String,
    /// Installed version; path-sourced plugins are not versioned
    #[serde(default)]
    pub version: Option<String>,
    /// Provenance tag
    pub install_type: InstallType,
    /// Capability-version tag of the plugin API this plugin targets
    pub api_generation: u32,
    /// Source location, for path-sourced plugins
    #[serde(default)]
    pub source_path: Option<String>,
    /// Installation timestamp (RFC 3339)
    #[serde(default)]
    pub installed_at: Option<String>,
    /// Last mutation timestamp (RFC 3339)
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl PluginRecord {
    /// Record for a plugin installed from the package index or an archive
    pub fn remote(name: &str, version: Option<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: name.to_string(),
            version,
            install_type: InstallType::Remote,
            api_generation: CURRENT_API_GENERATION,
            source_path: None,
            installed_at: Some(now.clone()),
            last_updated: Some(now),
        }
    }

    /// Record for a plugin referenced from a local source path
    pub fn path(name: &str, source_path: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: name.to_string(),
            version: None,
            install_type: InstallType::Path,
            api_generation: CURRENT_API_GENERATION,
            source_path: Some(source_path.to_string()),
            installed_at: Some(now.clone()),
            last_updated: Some(now),
        }
    }
}

/// Search result: plugin name to available versions, newest first.
///
/// Version ordering is the index's own; the lifecycle manager trusts it
/// and never re-sorts.
pub type VersionSet = BTreeMap<String, Vec<String>>;

/// What a successful lifecycle operation actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Installed {
        name: String,
        version: Option<String>,
        origin: InstallOrigin,
    },
    Updated {
        name: String,
        old_versions: Vec<String>,
        new_version: String,
    },
    Uninstalled {
        name: String,
        versions: Vec<String>,
        install_type: InstallType,
    },
}

/// Where an install came from, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOrigin {
    Archive,
    SourcePath,
    Index,
}

/// The requested end state already holds; nothing was mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOp {
    /// The effective requested version is already installed. `explicit`
    /// distinguishes a user-supplied version from a resolved latest.
    AlreadyAtVersion {
        name: String,
        version: String,
        explicit: bool,
    },
    /// Installed, but not at the requested version; install never
    /// silently upgrades
    UpdateRequired {
        name: String,
        requested: Option<String>,
        installed: Vec<String>,
    },
    /// Update requested but the latest version is already installed
    AlreadyLatest { name: String, version: String },
}

/// Terminal outcome of a lifecycle operation.
///
/// Returned by value, never raised, so callers cannot mistake a no-op
/// for an error or vice versa.
#[derive(Debug)]
pub enum Outcome {
    Success(Change),
    AlreadySatisfied(NoOp),
    Failure(VeriscanError),
}

impl Outcome {
    /// Process exit code: 0 success, 1 hard error, 2 nothing-to-do.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success(_) => 0,
            Self::AlreadySatisfied(_) => 2,
            Self::Failure(err) => err.exit_code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_type_display() {
        assert_eq!(InstallType::Core.to_string(), "core");
        assert_eq!(InstallType::Remote.to_string(), "remote");
        assert_eq!(InstallType::Path.to_string(), "path");
    }

    #[test]
    fn test_install_type_serde_lowercase() {
        let json = serde_json::to_string(&InstallType::Bundle).unwrap();
        assert_eq!(json, r#""bundle""#);

        let back: InstallType = serde_json::from_str(r#""remote""#).unwrap();
        assert_eq!(back, InstallType::Remote);
    }

    #[test]
    fn test_remote_record() {
        let record = PluginRecord::remote("veriscan-foo", Some("1.2.3".to_string()));
        assert_eq!(record.install_type, InstallType::Remote);
        assert_eq!(record.version.as_deref(), Some("1.2.3"));
        assert_eq!(record.api_generation, CURRENT_API_GENERATION);
        assert!(record.installed_at.is_some());
    }

    #[test]
    fn test_path_record_is_unversioned() {
        let record = PluginRecord::path("probe-dev", "./probe-dev");
        assert_eq!(record.install_type, InstallType::Path);
        assert!(record.version.is_none());
        assert_eq!(record.source_path.as_deref(), Some("./probe-dev"));
    }

    #[test]
    fn test_outcome_exit_codes() {
        let success = Outcome::Success(Change::Installed {
            name: "veriscan-foo".to_string(),
            version: Some("1.0.0".to_string()),
            origin: InstallOrigin::Index,
        });
        assert_eq!(success.exit_code(), 0);

        let noop = Outcome::AlreadySatisfied(NoOp::AlreadyLatest {
            name: "veriscan-foo".to_string(),
            version: "1.0.0".to_string(),
        });
        assert_eq!(noop.exit_code(), 2);

        let failure = Outcome::Failure(VeriscanError::NotInstalled {
            name: "veriscan-foo".to_string(),
        });
        assert_eq!(failure.exit_code(), 1);

        let path_refusal = Outcome::Failure(VeriscanError::PathInstallCannotUpdate {
            name: "veriscan-foo".to_string(),
        });
        assert_eq!(path_refusal.exit_code(), 2);
    }

    #[test]
    fn test_record_roundtrip() {
        let record = PluginRecord::remote("probe-ssh", Some("0.4.0".to_string()));
        let json = serde_json::to_string(&record).unwrap();
        let back: PluginRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
