use indexmap::IndexMap;

/// A published release, reduced to what version hashing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Display name; falls back to the tag when the release is unnamed.
    pub name: String,
    pub tag: String,
    pub prerelease: bool,
    /// Asset file name -> direct download URL.
    pub assets: IndexMap<String, String>,
    /// Publication timestamp as reported by the API (RFC 3339); unset for drafts.
    pub published_at: Option<String>,
}

impl Release {
    pub fn asset_url(&self, asset_name: &str) -> Option<&str> {
        self.assets.get(asset_name).map(String::as_str)
    }

    /// The tag with a single leading `v` removed.
    pub fn version(&self) -> &str {
        self.tag.strip_prefix('v').unwrap_or(&self.tag)
    }
}
