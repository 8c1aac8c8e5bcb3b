//! Package resolution against a PyPI-compatible JSON index.
//!
//! Only pure-Python wheels are installable: the interpreter imports them
//! straight from the archive via `zipimport`, so nothing is unpacked.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PlaygroundError, Result};

/// Project metadata as served by `GET {index}/{name}/json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInfo {
    /// Files of the latest release.
    #[serde(default)]
    pub urls: Vec<ReleaseFile>,
}

/// One distribution file of a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFile {
    /// Archive file name, e.g. `six-1.16.0-py2.py3-none-any.whl`.
    pub filename: String,
    /// Download URL.
    pub url: String,
    /// `bdist_wheel` or `sdist`.
    pub packagetype: String,
}

impl ReleaseFile {
    /// Whether this file is a wheel that runs on any Python 3 interpreter.
    pub fn is_pure_python_wheel(&self) -> bool {
        if self.packagetype != "bdist_wheel" || !self.filename.ends_with("-none-any.whl") {
            return false;
        }
        // name-version(-build)?-pytag-abitag-platform.whl
        let stem = self.filename.trim_end_matches(".whl");
        stem.rsplitn(4, '-')
            .nth(2)
            .map(|python_tag| python_tag.split('.').any(|tag| tag == "py3"))
            .unwrap_or(false)
    }
}

/// A downloaded wheel ready to be written into the interpreter session.
#[derive(Debug, Clone)]
pub struct Wheel {
    /// Archive file name.
    pub filename: String,
    /// Archive bytes.
    pub bytes: Vec<u8>,
}

/// Pick the first pure-Python wheel of a release.
pub fn select_wheel(project: &ProjectInfo) -> Option<&ReleaseFile> {
    project.urls.iter().find(|file| file.is_pure_python_wheel())
}

/// Reject names that are not plain distribution names.
pub fn validate_package_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlaygroundError::InvalidInput(
            "package name must not be blank".to_string(),
        ));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid || name.starts_with(['-', '.']) {
        return Err(PlaygroundError::InvalidInput(format!(
            "'{}' is not a valid package name",
            name
        )));
    }
    Ok(name)
}

/// Client for a PyPI-compatible JSON index.
#[derive(Debug, Clone)]
pub struct PackageIndex {
    client: reqwest::Client,
    base_url: String,
}

impl PackageIndex {
    /// Create a client for the index rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL of the index.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `name` and download its pure-Python wheel.
    pub async fn fetch_wheel(&self, name: &str) -> Result<Wheel> {
        let name = validate_package_name(name)?;
        let url = format!("{}/{}/json", self.base_url, name);
        debug!(package = name, url = %url, "resolving package");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PlaygroundError::PackageInstall {
                package: name.to_string(),
                reason: format!("no package named '{}' in the index", name),
            });
        }
        let project: ProjectInfo = response.error_for_status()?.json().await?;

        let file = select_wheel(&project).ok_or_else(|| PlaygroundError::PackageInstall {
            package: name.to_string(),
            reason: format!("'{}' has no pure-Python wheel", name),
        })?;

        debug!(package = name, wheel = %file.filename, "downloading wheel");
        let bytes = self
            .client
            .get(&file.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(Wheel {
            filename: file.filename.clone(),
            bytes: bytes.to_vec(),
        })
    }
}
