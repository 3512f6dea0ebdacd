//! Package backend
//!
//! Low-level plugin placement and removal. The lifecycle manager drives
//! it through the `PackageBackend` trait and never assumes partial
//! success; every method either completes or fails loudly.
//!
//! `FsBackend` is the production adapter: packages live under
//! `<base>/plugins/<name>/<version>/`, archives are gzipped tarballs
//! carrying a `plugin.toml` at their root, and remote packages are
//! downloaded from the index's download endpoint. Source-path installs
//! place no files at all; the registry entry is their only state.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;

use crate::error::{Result, VeriscanError};
use crate::plugin::manifest::{PluginManifest, PLUGIN_MANIFEST_FILE};

const CHECKSUM_HEADER: &str = "x-content-sha256";

/// One placed package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// What to install and from where
#[derive(Debug)]
pub enum InstallRequest<'a> {
    /// Local package archive file
    Archive(&'a Path),
    /// Local source checkout or entry-point file
    SourcePath(&'a Path),
    /// Fetch from the index; `None` means the backend picks the latest
    Remote { version: Option<&'a str> },
}

/// Package installer port
pub trait PackageBackend {
    fn install(&self, name: &str, request: InstallRequest<'_>) -> Result<()>;
    fn update(&self, name: &str) -> Result<()>;
    fn uninstall(&self, name: &str) -> Result<()>;
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>>;
}

/// Filesystem package backend
pub struct FsBackend {
    /// Package root (<base>/plugins)
    plugins_dir: PathBuf,
    index_url: String,
    client: reqwest::blocking::Client,
}

impl FsBackend {
    pub fn new(plugins_dir: PathBuf, index_url: &str) -> Self {
        Self {
            plugins_dir,
            index_url: index_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    fn staging_dir(&self, name: &str) -> PathBuf {
        self.plugins_dir.join(".staging").join(name)
    }

    /// Unpack an archive into place. The embedded manifest is the
    /// authority on the version; its name must match the requested one.
    fn unpack<R: Read>(&self, name: &str, reader: R) -> Result<String> {
        let staging = self.staging_dir(name);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        Archive::new(GzDecoder::new(reader)).unpack(&staging)?;

        let manifest = match PluginManifest::load(&staging) {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };
        if manifest.name != name {
            let _ = fs::remove_dir_all(&staging);
            return Err(VeriscanError::InstallFailed {
                name: name.to_string(),
                message: format!("archive contains plugin '{}'", manifest.name),
            });
        }

        let target = self.plugins_dir.join(name).join(&manifest.version);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&staging, &target)?;

        Ok(manifest.version)
    }

    /// Download a package archive from the index, verifying the SHA-256
    /// checksum when the index provides one.
    fn download(&self, name: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let url = format!("{}/api/v1/plugins/{}/download", self.index_url, name);
        let mut request = self.client.get(&url);
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }

        let response = request.send().map_err(|e| VeriscanError::InstallFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(VeriscanError::InstallFailed {
                name: name.to_string(),
                message: format!("index returned HTTP {}", response.status()),
            });
        }

        let expected = response
            .headers()
            .get(CHECKSUM_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .map_err(|e| VeriscanError::InstallFailed {
                name: name.to_string(),
                message: e.to_string(),
            })?
            .to_vec();

        if let Some(expected) = expected {
            let actual = hex::encode(Sha256::digest(&bytes));
            if !actual.eq_ignore_ascii_case(&expected) {
                return Err(VeriscanError::InstallFailed {
                    name: name.to_string(),
                    message: format!("checksum mismatch: expected {}, got {}", expected, actual),
                });
            }
        }

        Ok(bytes)
    }
}

impl PackageBackend for FsBackend {
    fn install(&self, name: &str, request: InstallRequest<'_>) -> Result<()> {
        match request {
            InstallRequest::Archive(path) => {
                let file = fs::File::open(path)?;
                self.unpack(name, file)?;
                Ok(())
            }
            InstallRequest::SourcePath(path) => {
                // nothing to place; the loader reads the source where it
                // is. A manifest, when present, must name this plugin.
                if path.is_dir() && path.join(PLUGIN_MANIFEST_FILE).exists() {
                    let manifest = PluginManifest::load(path)?;
                    if manifest.name != name {
                        return Err(VeriscanError::InstallFailed {
                            name: name.to_string(),
                            message: format!("source declares plugin '{}'", manifest.name),
                        });
                    }
                }
                Ok(())
            }
            InstallRequest::Remote { version } => {
                let bytes = self.download(name, version)?;
                self.unpack(name, bytes.as_slice())?;
                Ok(())
            }
        }
    }

    fn update(&self, name: &str) -> Result<()> {
        // an update is an install of the index's current latest; older
        // versions stay in place until the plugin is uninstalled
        let bytes = self.download(name, None)?;
        self.unpack(name, bytes.as_slice())?;
        Ok(())
    }

    fn uninstall(&self, name: &str) -> Result<()> {
        let dir = self.plugins_dir.join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let mut packages = Vec::new();
        if !self.plugins_dir.exists() {
            return Ok(packages);
        }

        for entry in fs::read_dir(&self.plugins_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !entry.file_type()?.is_dir() || name.starts_with('.') {
                continue;
            }
            for version_entry in fs::read_dir(entry.path())? {
                let version_entry = version_entry?;
                if version_entry.file_type()?.is_dir() {
                    packages.push(InstalledPackage {
                        name: name.clone(),
                        version: version_entry.file_name().to_string_lossy().to_string(),
                    });
                }
            }
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_backend() -> (FsBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = FsBackend::new(
            temp_dir.path().join("plugins"),
            "https://index.invalid",
        );
        (backend, temp_dir)
    }

    /// Build a .vpkg archive with a plugin.toml and one payload file
    fn build_vpkg(dir: &Path, name: &str, version: &str) -> PathBuf {
        let content_dir = dir.join("content");
        fs::create_dir_all(&content_dir).unwrap();

        let manifest = format!("name = \"{}\"\nversion = \"{}\"\n", name, version);
        fs::write(content_dir.join(PLUGIN_MANIFEST_FILE), manifest).unwrap();
        fs::write(content_dir.join("entry.wasm"), b"\0asm").unwrap();

        let archive_path = dir.join(format!("{}-{}.vpkg", name, version));
        let file = fs::File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_path_with_name(content_dir.join(PLUGIN_MANIFEST_FILE), PLUGIN_MANIFEST_FILE)
            .unwrap();
        builder
            .append_path_with_name(content_dir.join("entry.wasm"), "entry.wasm")
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();

        fs::remove_dir_all(&content_dir).unwrap();
        archive_path
    }

    #[test]
    fn test_install_archive_places_version_dir() {
        let (backend, temp) = create_test_backend();
        let archive = build_vpkg(temp.path(), "veriscan-foo", "0.2.0");

        backend
            .install("veriscan-foo", InstallRequest::Archive(&archive))
            .unwrap();

        assert!(backend.plugins_dir().join("veriscan-foo/0.2.0").join(PLUGIN_MANIFEST_FILE).exists());
        let packages = backend.installed_packages().unwrap();
        assert_eq!(
            packages,
            vec![InstalledPackage {
                name: "veriscan-foo".to_string(),
                version: "0.2.0".to_string(),
            }]
        );
    }

    #[test]
    fn test_install_archive_name_mismatch() {
        let (backend, temp) = create_test_backend();
        let archive = build_vpkg(temp.path(), "veriscan-other", "0.2.0");

        let err = backend
            .install("veriscan-foo", InstallRequest::Archive(&archive))
            .unwrap_err();
        assert!(matches!(err, VeriscanError::InstallFailed { .. }));
        assert!(backend.installed_packages().unwrap().is_empty());
    }

    #[test]
    fn test_source_path_places_nothing() {
        let (backend, temp) = create_test_backend();
        let source = temp.path().join("probe-dev");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join(PLUGIN_MANIFEST_FILE),
            "name = \"probe-dev\"\nversion = \"0.0.0\"\n",
        )
        .unwrap();

        backend
            .install("probe-dev", InstallRequest::SourcePath(&source))
            .unwrap();
        assert!(backend.installed_packages().unwrap().is_empty());
    }

    #[test]
    fn test_source_path_manifest_mismatch() {
        let (backend, temp) = create_test_backend();
        let source = temp.path().join("probe-dev");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join(PLUGIN_MANIFEST_FILE),
            "name = \"probe-something-else\"\nversion = \"0.0.0\"\n",
        )
        .unwrap();

        let err = backend
            .install("probe-dev", InstallRequest::SourcePath(&source))
            .unwrap_err();
        assert!(matches!(err, VeriscanError::InstallFailed { .. }));
    }

    #[test]
    fn test_uninstall_removes_all_versions() {
        let (backend, temp) = create_test_backend();
        for version in ["0.1.0", "0.2.0"] {
            let archive = build_vpkg(temp.path(), "veriscan-foo", version);
            backend
                .install("veriscan-foo", InstallRequest::Archive(&archive))
                .unwrap();
        }
        assert_eq!(backend.installed_packages().unwrap().len(), 2);

        backend.uninstall("veriscan-foo").unwrap();
        assert!(backend.installed_packages().unwrap().is_empty());

        // uninstalling with no package dirs is fine; path installs
        // have nothing on disk
        backend.uninstall("veriscan-foo").unwrap();
    }

    #[test]
    fn test_installed_packages_skips_staging() {
        let (backend, _temp) = create_test_backend();
        fs::create_dir_all(backend.plugins_dir().join(".staging/veriscan-foo")).unwrap();
        assert!(backend.installed_packages().unwrap().is_empty());
    }
}
