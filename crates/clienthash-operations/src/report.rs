//! The version list document and its writer.

use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::Path,
};

use clienthash_utils::fs::ensure_dir_exists;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::{ErrorContext, HashGenError, Result};

/// Hashes identifying one release, keyed by digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Release tag without its leading `v`.
    pub version: String,
    /// `null` for releases the API reports without a publication date.
    pub release_date: Option<String>,
    /// Hex MD5 -> platform label.
    pub hashes: IndexMap<String, String>,
}

/// Every processed release of one client, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientVersionList {
    pub name: String,
    pub versions: Vec<VersionRecord>,
}

const INDENT: &[u8] = b"    ";

/// Serializes `lists` to `path` as JSON indented by four spaces.
///
/// Missing parent directories are created.
pub fn write_report(path: &Path, lists: &[ClientVersionList]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
    lists.serialize(&mut serializer).map_err(|err| {
        HashGenError::Report {
            path: path.to_path_buf(),
            source: err,
        }
    })?;

    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
