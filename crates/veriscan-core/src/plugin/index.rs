//! Package index access
//!
//! The remote index is the authority on which plugins exist and which
//! versions they have. The lifecycle manager talks to it through the
//! `PackageIndex` trait; `HttpPackageIndex` is the production adapter.

use crate::error::{Result, VeriscanError};
use crate::plugin::types::VersionSet;

/// How much of a plugin's version history a search returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the newest version per plugin
    Latest,
    /// Every published version, newest first
    All,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::All => "all",
        }
    }
}

/// Remote package index port
pub trait PackageIndex {
    /// Search the index. Versions in the result are ordered newest
    /// first by the index itself. Transport problems surface as
    /// `VeriscanError::Search`.
    fn search(&self, pattern: &str, exact: bool, scope: SearchScope) -> Result<VersionSet>;
}

/// Determine the latest published version of a plugin, or `None` when
/// the index has no entry for the name.
///
/// This is an expensive remote call; callers only reach for it when no
/// explicit version was supplied.
pub fn resolve_latest(index: &dyn PackageIndex, name: &str) -> Result<Option<String>> {
    let results = index.search(name, true, SearchScope::Latest)?;
    Ok(results.get(name).and_then(|versions| versions.first()).cloned())
}

/// Blocking HTTP adapter for the veriscan package index
pub struct HttpPackageIndex {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpPackageIndex {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PackageIndex for HttpPackageIndex {
    fn search(&self, pattern: &str, exact: bool, scope: SearchScope) -> Result<VersionSet> {
        let url = format!("{}/api/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", pattern),
                ("exact", if exact { "true" } else { "false" }),
                ("scope", scope.as_str()),
            ])
            .send()
            .map_err(|e| VeriscanError::Search {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(VeriscanError::Search {
                message: format!("index returned HTTP {}", response.status()),
            });
        }

        response.json().map_err(|e| VeriscanError::Search {
            message: format!("malformed index response: {}", e),
        })
    }
}
