//! Plugin lifecycle
//!
//! Everything needed to install, update, uninstall, and search veriscan
//! plugins:
//!
//! - `source`: classify an install argument (archive / source path / index)
//! - `index`: package index port, latest-version resolution, HTTP adapter
//! - `backend`: package placement port and filesystem adapter
//! - `registry`: the persisted installed-plugin registry
//! - `lifecycle`: the manager tying it all together
//! - `manifest`: plugin.toml parsing

pub mod backend;
pub mod index;
pub mod lifecycle;
pub mod manifest;
pub mod registry;
pub mod source;
pub mod types;

// Re-exports
pub use backend::{FsBackend, InstallRequest, InstalledPackage, PackageBackend};
pub use index::{resolve_latest, HttpPackageIndex, PackageIndex, SearchScope};
pub use lifecycle::LifecycleManager;
pub use manifest::{PluginManifest, PLUGIN_MANIFEST_FILE};
pub use registry::{PluginRegistry, RegistryFile};
pub use source::{classify, InstallSource, ARCHIVE_SUFFIX, PLUGIN_PREFIXES};
pub use types::{
    Change, InstallOrigin, InstallType, NoOp, Outcome, PluginRecord, VersionSet,
    CURRENT_API_GENERATION,
};
