//! Install-source classification
//!
//! Decides, purely syntactically, whether an install argument names a
//! local package archive, a local source path, or a package to fetch
//! from the index. Existence of referenced files is checked by the
//! lifecycle manager, not here.

use std::path::{Path, PathBuf};

use crate::error::{Result, VeriscanError};

/// Filename suffix recognized as a local plugin package archive
pub const ARCHIVE_SUFFIX: &str = ".vpkg";

/// Namespace prefixes every mutable-operation plugin name must carry
pub const PLUGIN_PREFIXES: &[&str] = &["veriscan-", "probe-"];

/// Where an install argument points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// Local package archive file
    Archive { path: PathBuf },
    /// Local source checkout or single entry-point file
    SourcePath { path: PathBuf },
    /// Named package to resolve against the index; the version comes
    /// from a separate option, never from the argument itself
    Remote {
        name: String,
        version: Option<String>,
    },
}

/// Classify a raw install argument. Total: always routes to one of the
/// three cases, never fails.
pub fn classify(raw: &str) -> InstallSource {
    if raw.ends_with(ARCHIVE_SUFFIX) {
        InstallSource::Archive {
            path: PathBuf::from(raw),
        }
    } else if raw.contains(['/', '\\']) {
        InstallSource::SourcePath {
            path: PathBuf::from(raw),
        }
    } else {
        InstallSource::Remote {
            name: raw.to_string(),
            version: None,
        }
    }
}

/// Check the namespace prefix rule for a plugin name.
pub fn check_plugin_name(name: &str) -> Result<()> {
    if PLUGIN_PREFIXES.iter().any(|p| name.starts_with(p)) {
        Ok(())
    } else {
        Err(VeriscanError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Derive plugin name and version from an archive filename.
///
/// `veriscan-my-plugin-0.2.0.vpkg` splits at the last dash into
/// (`veriscan-my-plugin`, `0.2.0`). A basename without a dash cannot
/// carry a valid namespace prefix, so it is rejected as an invalid name.
pub fn archive_name_parts(path: &Path) -> Result<(String, String)> {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = basename
        .strip_suffix(ARCHIVE_SUFFIX)
        .unwrap_or(&basename)
        .to_string();

    match stem.rsplit_once('-') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok((name.to_string(), version.to_string()))
        }
        _ => Err(VeriscanError::InvalidName { name: stem }),
    }
}

/// Derive a plugin name from a source path: the final path component,
/// minus the extension when the path is a single entry-point file.
pub fn path_plugin_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_archive() {
        let source = classify("veriscan-my-plugin-0.2.0.vpkg");
        assert_eq!(
            source,
            InstallSource::Archive {
                path: PathBuf::from("veriscan-my-plugin-0.2.0.vpkg")
            }
        );
    }

    #[test]
    fn test_classify_source_path() {
        let source = classify("./vendor/my-plugin");
        assert_eq!(
            source,
            InstallSource::SourcePath {
                path: PathBuf::from("./vendor/my-plugin")
            }
        );
    }

    #[test]
    fn test_classify_backslash_is_source_path() {
        let source = classify(r"vendor\my-plugin");
        assert!(matches!(source, InstallSource::SourcePath { .. }));
    }

    #[test]
    fn test_classify_remote() {
        let source = classify("veriscan-my-plugin");
        assert_eq!(
            source,
            InstallSource::Remote {
                name: "veriscan-my-plugin".to_string(),
                version: None,
            }
        );
    }

    #[test]
    fn test_classify_partial_suffix_is_remote() {
        // a bare name ending in a fragment of the suffix still routes
        assert!(matches!(
            classify("veriscan-vpkg"),
            InstallSource::Remote { .. }
        ));
    }

    #[test]
    fn test_archive_path_with_separator_still_archive() {
        // suffix wins over the separator rule
        assert!(matches!(
            classify("./dist/veriscan-foo-1.0.0.vpkg"),
            InstallSource::Archive { .. }
        ));
    }

    #[test]
    fn test_check_plugin_name() {
        assert!(check_plugin_name("veriscan-foo").is_ok());
        assert!(check_plugin_name("probe-ssh").is_ok());
        assert!(check_plugin_name("shiny-new-plugin").is_err());
        assert!(check_plugin_name("veriscan").is_err());
    }

    #[test]
    fn test_archive_name_parts() {
        let (name, version) =
            archive_name_parts(Path::new("./dist/veriscan-my-plugin-0.2.0.vpkg")).unwrap();
        assert_eq!(name, "veriscan-my-plugin");
        assert_eq!(version, "0.2.0");
    }

    #[test]
    fn test_archive_name_parts_no_dash() {
        assert!(archive_name_parts(Path::new("plugin.vpkg")).is_err());
    }

    #[test]
    fn test_path_plugin_name_directory() {
        assert_eq!(path_plugin_name(Path::new("./vendor/probe-rot13")), "probe-rot13");
    }

    #[test]
    fn test_path_plugin_name_entry_point_file() {
        assert_eq!(
            path_plugin_name(Path::new("demo/probe-rot13.wasm")),
            "probe-rot13"
        );
    }
}
