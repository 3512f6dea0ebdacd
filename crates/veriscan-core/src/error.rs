use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VeriscanError {
    #[error("invalid plugin name '{name}' - plugin names must begin with 'veriscan-' or 'probe-'")]
    InvalidName { name: String },

    #[error("no such plugin source {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("no such plugin '{name}' found in the package index")]
    NoSuchPackage { name: String },

    #[error("'{name}' exists, but version {version} was not found in the package index")]
    NoSuchVersion { name: String, version: String },

    #[error("cannot update '{name}' - installed via source path reference; uninstall it instead")]
    PathInstallCannotUpdate { name: String },

    #[error("no such plugin installed: {name}")]
    NotInstalled { name: String },

    #[error("update of '{name}' failed: {message}")]
    UpdateFailed { name: String, message: String },

    #[error("installation of '{name}' failed: {message}")]
    InstallFailed { name: String, message: String },

    #[error("package index search failed: {message}")]
    Search { message: String },

    #[error("registry file {} is corrupt: {message}", .path.display())]
    RegistryParse { path: PathBuf, message: String },

    #[error("invalid plugin manifest {}: {message}", .path.display())]
    ManifestParse { path: PathBuf, message: String },

    #[error("config parse error in {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, VeriscanError>;

impl VeriscanError {
    /// Process exit code for this error. Path-based installs refuse to
    /// update with the no-op code rather than the hard-error code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PathInstallCannotUpdate { .. } => 2,
            _ => 1,
        }
    }
}
