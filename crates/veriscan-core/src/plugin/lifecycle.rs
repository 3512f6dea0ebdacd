//! Plugin lifecycle manager
//!
//! Orchestrates install, update, uninstall, and search as state
//! transitions over the installed-plugin registry. Each mutating
//! operation returns a three-way `Outcome`; remote and backend failures
//! never escape as raw errors.
//!
//! Per-name states are "absent" (no registry record) and "installed".
//! Install refuses to touch an installed plugin except to report why;
//! update is the only transition that moves an installed plugin
//! forward, and only for index-sourced installs.

use crate::error::{Result, VeriscanError};
use crate::plugin::backend::{InstallRequest, PackageBackend};
use crate::plugin::index::{resolve_latest, PackageIndex, SearchScope};
use crate::plugin::registry::PluginRegistry;
use crate::plugin::source::{self, InstallSource};
use crate::plugin::types::{
    Change, InstallOrigin, InstallType, NoOp, Outcome, PluginRecord, VersionSet,
};

/// Plugin lifecycle manager.
///
/// Holds its collaborators as ports so tests can substitute fakes.
pub struct LifecycleManager {
    registry: PluginRegistry,
    index: Box<dyn PackageIndex>,
    backend: Box<dyn PackageBackend>,
}

impl LifecycleManager {
    pub fn new(
        registry: PluginRegistry,
        index: Box<dyn PackageIndex>,
        backend: Box<dyn PackageBackend>,
    ) -> Self {
        Self {
            registry,
            index,
            backend,
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Install a plugin from an archive, a source path, or the index.
    ///
    /// `requested_version` applies to index installs only; archive
    /// versions come from the filename and path installs are
    /// unversioned.
    pub fn install(&self, raw_argument: &str, requested_version: Option<&str>) -> Outcome {
        self.install_inner(raw_argument, requested_version)
            .unwrap_or_else(Outcome::Failure)
    }

    /// Update an index-installed plugin to the latest version.
    pub fn update(&self, name: &str) -> Outcome {
        self.update_inner(name).unwrap_or_else(Outcome::Failure)
    }

    /// Uninstall a plugin of any installation type.
    pub fn uninstall(&self, name: &str) -> Outcome {
        self.uninstall_inner(name).unwrap_or_else(Outcome::Failure)
    }

    /// Search the package index. An empty result is an empty success,
    /// not an error; the reporting layer gives it a distinct exit code.
    pub fn search(&self, pattern: &str, exact: bool, scope: SearchScope) -> Result<VersionSet> {
        self.index.search(pattern, exact, scope)
    }

    /// All registry records.
    pub fn statuses(&self) -> Result<Vec<PluginRecord>> {
        self.registry.statuses()
    }

    /// Versions of `name` currently placed by the backend.
    pub fn installed_versions(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .backend
            .installed_packages()?
            .into_iter()
            .filter(|package| package.name == name)
            .map(|package| package.version)
            .collect())
    }

    // ========== install ==========

    fn install_inner(
        &self,
        raw_argument: &str,
        requested_version: Option<&str>,
    ) -> Result<Outcome> {
        match source::classify(raw_argument) {
            InstallSource::Archive { path } => self.install_archive(&path),
            InstallSource::SourcePath { path } => self.install_source_path(&path),
            InstallSource::Remote { name, version } => {
                let version = version.as_deref().or(requested_version);
                self.install_remote(&name, version)
            }
        }
    }

    fn install_archive(&self, path: &std::path::Path) -> Result<Outcome> {
        if !path.exists() {
            return Err(VeriscanError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let (name, version) = source::archive_name_parts(path)?;
        source::check_plugin_name(&name)?;

        self.backend.install(&name, InstallRequest::Archive(path))?;
        self.registry
            .upsert(PluginRecord::remote(&name, Some(version.clone())))?;

        Ok(Outcome::Success(Change::Installed {
            name,
            version: Some(version),
            origin: InstallOrigin::Archive,
        }))
    }

    fn install_source_path(&self, path: &std::path::Path) -> Result<Outcome> {
        if !path.exists() {
            return Err(VeriscanError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let name = source::path_plugin_name(path);
        source::check_plugin_name(&name)?;

        self.backend
            .install(&name, InstallRequest::SourcePath(path))?;
        self.registry
            .upsert(PluginRecord::path(&name, &path.to_string_lossy()))?;

        Ok(Outcome::Success(Change::Installed {
            name,
            version: None,
            origin: InstallOrigin::SourcePath,
        }))
    }

    fn install_remote(&self, name: &str, requested_version: Option<&str>) -> Result<Outcome> {
        source::check_plugin_name(name)?;

        let pre_installed = self.installed_versions(name)?;
        if !pre_installed.is_empty() {
            return self.refuse_reinstall(name, requested_version, pre_installed);
        }

        if let Err(install_err) = self.backend.install(
            name,
            InstallRequest::Remote {
                version: requested_version,
            },
        ) {
            return Ok(Outcome::Failure(self.diagnose_install_failure(
                name,
                requested_version,
                install_err,
            )));
        }

        let post_installed = self.installed_versions(name)?;
        let new_version = newly_installed(&pre_installed, post_installed);
        self.registry
            .upsert(PluginRecord::remote(name, new_version.clone()))?;

        Ok(Outcome::Success(Change::Installed {
            name: name.to_string(),
            version: new_version,
            origin: InstallOrigin::Index,
        }))
    }

    /// The name already has installed versions. Work out which no-op
    /// applies; install never silently upgrades.
    fn refuse_reinstall(
        &self,
        name: &str,
        requested_version: Option<&str>,
        installed: Vec<String>,
    ) -> Result<Outcome> {
        let explicit = requested_version.is_some();
        // no explicit version means "the latest"; resolving it costs a
        // remote search, so only do it here
        let effective = match requested_version {
            Some(version) => Some(version.to_string()),
            None => resolve_latest(self.index.as_ref(), name)?,
        };

        if let Some(version) = &effective {
            if installed.iter().any(|v| v == version) {
                return Ok(Outcome::AlreadySatisfied(NoOp::AlreadyAtVersion {
                    name: name.to_string(),
                    version: version.clone(),
                    explicit,
                }));
            }
        }

        Ok(Outcome::AlreadySatisfied(NoOp::UpdateRequired {
            name: name.to_string(),
            requested: effective,
            installed,
        }))
    }

    /// One diagnostic search to turn an opaque backend failure into
    /// something actionable. When the search itself fails, the original
    /// failure stands.
    fn diagnose_install_failure(
        &self,
        name: &str,
        requested_version: Option<&str>,
        install_err: VeriscanError,
    ) -> VeriscanError {
        let results = match self.index.search(name, true, SearchScope::All) {
            Ok(results) => results,
            Err(_) => return install_err,
        };

        match results.get(name) {
            None => VeriscanError::NoSuchPackage {
                name: name.to_string(),
            },
            Some(versions) => match requested_version {
                Some(version) if !versions.iter().any(|v| v == version) => {
                    VeriscanError::NoSuchVersion {
                        name: name.to_string(),
                        version: version.to_string(),
                    }
                }
                _ => install_err,
            },
        }
    }

    // ========== update ==========

    fn update_inner(&self, name: &str) -> Result<Outcome> {
        source::check_plugin_name(name)?;

        let pre_installed = self.installed_versions(name)?;
        if pre_installed.is_empty() {
            match self.registry.get(name)? {
                None => {
                    return Err(VeriscanError::NotInstalled {
                        name: name.to_string(),
                    })
                }
                Some(record) if record.install_type == InstallType::Path => {
                    return Err(VeriscanError::PathInstallCannotUpdate {
                        name: name.to_string(),
                    })
                }
                // core/bundle records have no package dirs; fall
                // through and treat the update as a fresh fetch
                Some(_) => {}
            }
        }

        let latest = resolve_latest(self.index.as_ref(), name)?.ok_or_else(|| {
            VeriscanError::NoSuchPackage {
                name: name.to_string(),
            }
        })?;

        if pre_installed.iter().any(|v| v == &latest) {
            return Ok(Outcome::AlreadySatisfied(NoOp::AlreadyLatest {
                name: name.to_string(),
                version: latest,
            }));
        }

        if let Err(e) = self.backend.update(name) {
            return Err(VeriscanError::UpdateFailed {
                name: name.to_string(),
                message: e.to_string(),
            });
        }

        let post_installed = self.installed_versions(name)?;
        let new_version = newly_installed(&pre_installed, post_installed).unwrap_or(latest);

        // reconcile the registry with what actually landed
        let mut record = self
            .registry
            .get(name)?
            .unwrap_or_else(|| PluginRecord::remote(name, None));
        record.version = Some(new_version.clone());
        record.last_updated = Some(chrono::Utc::now().to_rfc3339());
        self.registry.upsert(record)?;

        Ok(Outcome::Success(Change::Updated {
            name: name.to_string(),
            old_versions: pre_installed,
            new_version,
        }))
    }

    // ========== uninstall ==========

    fn uninstall_inner(&self, name: &str) -> Result<Outcome> {
        let Some(record) = self.registry.get(name)? else {
            return Err(VeriscanError::NotInstalled {
                name: name.to_string(),
            });
        };

        let versions = self.installed_versions(name)?;

        // delegated regardless of type; for path installs the backend
        // touches nothing and only the registry entry goes away
        self.backend.uninstall(name)?;
        self.registry.remove(name)?;

        Ok(Outcome::Success(Change::Uninstalled {
            name: name.to_string(),
            versions,
            install_type: record.install_type,
        }))
    }
}

/// The one version present after a mutation that was not present before.
fn newly_installed(pre: &[String], post: Vec<String>) -> Option<String> {
    post.into_iter().find(|v| !pre.iter().any(|p| p == v))
}
