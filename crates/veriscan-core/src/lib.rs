pub mod config;
pub mod error;
pub mod plugin;

pub use config::{Config, DEFAULT_INDEX_URL};
pub use error::{Result, VeriscanError};
pub use plugin::{
    classify, resolve_latest, Change, FsBackend, HttpPackageIndex, InstallOrigin, InstallRequest,
    InstallSource, InstallType, InstalledPackage, LifecycleManager, NoOp, Outcome, PackageBackend,
    PackageIndex, PluginManifest, PluginRecord, PluginRegistry, SearchScope, VersionSet,
    ARCHIVE_SUFFIX, CURRENT_API_GENERATION, PLUGIN_PREFIXES,
};
