//! Extraction strategies, one per release asset container format.
//!
//! Every strategy takes an asset URL and the path of a member inside the asset and
//! returns the MD5 digest of that member, or `None` when the asset does not contain it.

use std::fmt;

use crate::error::Result;

pub mod appimage;
pub mod common;
pub mod installer;
pub mod zipfile;

/// Work a strategy reports while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    Downloading,
    Extracting,
}

/// Settings shared by the subprocess based strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Program invoked as `<tool> -j <archive> <member> -d <dir>` for installers.
    pub installer_tool: String,
    /// Directory created by `<appimage> --appimage-extract`.
    pub appimage_extract_dir: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            installer_tool: "unzip".to_string(),
            appimage_extract_dir: "squashfs-root".to_string(),
        }
    }
}

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractKind {
    /// Plain zip archive, decoded while it streams in.
    Zip,
    /// Self-mounting Linux application image.
    AppImage,
    /// Self-extracting installer executable.
    Installer,
}

impl ExtractKind {
    /// Maps a client document `type` tag to a strategy.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "zip" => Some(Self::Zip),
            "appimage" => Some(Self::AppImage),
            "exe" => Some(Self::Installer),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::AppImage => "appimage",
            Self::Installer => "exe",
        }
    }

    /// Downloads `url` and digests `member` with the strategy for this format.
    ///
    /// `on_stage` is called when the strategy starts downloading and again when it starts
    /// looking for the member.
    ///
    /// # Returns
    ///
    /// `Ok(Some(hex_md5))` when the member was found, `Ok(None)` when it was not.
    pub fn extract(
        &self,
        url: &str,
        member: &str,
        options: &ExtractOptions,
        on_stage: &dyn Fn(ExtractStage),
    ) -> Result<Option<String>> {
        match self {
            Self::Zip => zipfile::digest_zip_member(url, member, on_stage),
            Self::AppImage => {
                appimage::digest_appimage_member(
                    url,
                    member,
                    &options.appimage_extract_dir,
                    on_stage,
                )
            }
            Self::Installer => {
                installer::digest_installer_member(url, member, &options.installer_tool, on_stage)
            }
        }
    }
}

impl fmt::Display for ExtractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(ExtractKind::from_tag("zip"), Some(ExtractKind::Zip));
        assert_eq!(ExtractKind::from_tag("appimage"), Some(ExtractKind::AppImage));
        assert_eq!(ExtractKind::from_tag("exe"), Some(ExtractKind::Installer));
        assert_eq!(ExtractKind::from_tag("msi"), None);
        assert_eq!(ExtractKind::from_tag("ZIP"), None);
    }

    #[test]
    fn test_tag_round_trip() {
        for kind in [ExtractKind::Zip, ExtractKind::AppImage, ExtractKind::Installer] {
            assert_eq!(ExtractKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.to_string(), kind.tag());
        }
    }
}
