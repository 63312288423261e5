//! Client descriptors: which repositories to track and which file inside each release
//! asset identifies a build.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Placeholder in [`FileSpec::asset_name`] replaced by the release tag.
pub const TAG_PLACEHOLDER: &str = "{tag}";

/// A trackable client application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    pub repo: String,
    /// Platform label -> file to hash for that platform, in declaration order.
    #[serde(default)]
    pub files: IndexMap<String, FileSpec>,
    /// Number of non-prerelease releases to process.
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_true")]
    pub support_android: bool,
    #[serde(default = "default_true")]
    pub support_ios: bool,
}

/// The member of a release asset whose bytes identify a build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileSpec {
    /// Asset file name; may contain `{tag}`.
    pub asset_name: String,
    /// Path of the member inside the asset.
    pub internal_name: String,
    /// Extraction type tag: `zip`, `appimage` or `exe`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_count() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_kind() -> String {
    "zip".to_string()
}

impl FileSpec {
    /// Substitutes `tag` for every `{tag}` placeholder in the asset name.
    pub fn resolve_asset_name(&self, tag: &str) -> String {
        self.asset_name.replace(TAG_PLACEHOLDER, tag)
    }
}

impl ClientDescriptor {
    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            ConfigError::InvalidClient {
                client: self.name.clone(),
                reason: reason.to_string(),
            }
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(invalid("owner and repo must not be empty"));
        }
        if self.count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        for (platform, file) in &self.files {
            if file.asset_name.is_empty() || file.internal_name.is_empty() {
                return Err(invalid(&format!(
                    "file for platform '{platform}' needs asset_name and internal_name"
                )));
            }
        }

        Ok(())
    }
}

/// Parses a client document (a JSON array of descriptors) and validates every entry.
pub fn parse_clients(content: &str, path: &Path) -> Result<Vec<ClientDescriptor>> {
    let clients: Vec<ClientDescriptor> =
        serde_json::from_str(content).map_err(|err| {
            ConfigError::ClientsParse {
                path: path.to_path_buf(),
                source: err,
            }
        })?;

    for client in &clients {
        client.validate()?;
    }

    Ok(clients)
}

/// Reads and parses the client document at `path`.
pub fn load_clients<P: AsRef<Path>>(path: P) -> Result<Vec<ClientDescriptor>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| {
        ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        }
    })?;
    parse_clients(&content, path)
}
