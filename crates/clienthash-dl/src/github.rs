//! Paginated access to the GitHub releases API.

use serde::Deserialize;
use tracing::{debug, trace};
use ureq::http::header::{ACCEPT, AUTHORIZATION};

use crate::{
    error::DownloadError, http::ensure_success, http_client::SHARED_AGENT, release::Release,
};

pub const API_UPSTREAM: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
pub const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        let name = release
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| release.tag_name.clone());

        Release {
            name,
            tag: release.tag_name,
            prerelease: release.prerelease,
            assets: release
                .assets
                .into_iter()
                .map(|asset| (asset.name, asset.browser_download_url))
                .collect(),
            published_at: release.published_at,
        }
    }
}

/// Releases API client for one API host.
pub struct Github<'a> {
    api_url: &'a str,
    token: Option<&'a str>,
}

impl<'a> Github<'a> {
    pub fn new(api_url: &'a str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/'),
            token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every listing request.
    pub fn token(mut self, token: Option<&'a str>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Fetches one page (up to [`PER_PAGE`] entries) of a repository's releases.
    ///
    /// # Errors
    ///
    /// * [`DownloadError::HttpError`] for any non-2xx status, including the 401/403/429
    ///   answers for bad credentials or exhausted rate limits.
    /// * [`DownloadError::InvalidResponse`] when the body is not a release array.
    pub fn fetch_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<GithubRelease>, DownloadError> {
        let url = format!("{}/repos/{owner}/{repo}/releases", self.api_url);
        trace!(url = %url, page, "fetching release page");

        let mut req = SHARED_AGENT
            .get(&url)
            .query("per_page", PER_PAGE.to_string())
            .query("page", page.to_string())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(token) = self.token {
            req = req.header(AUTHORIZATION, &format!("Bearer {}", token));
        }

        let mut resp = ensure_success(req.call()?, &url)?;

        resp.body_mut()
            .read_json::<Vec<GithubRelease>>()
            .map_err(|_| DownloadError::InvalidResponse)
    }

    /// Collects releases newest first until `count` non-prerelease entries are gathered or
    /// the listing is exhausted.
    pub fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        count: usize,
    ) -> Result<Vec<Release>, DownloadError> {
        collect_releases(count, |page| self.fetch_page(owner, repo, page))
    }
}

/// Pages through a release listing starting at page 1.
///
/// Prereleases are kept in the output but do not count towards `count`. Entries after the
/// one that reaches `count` are dropped, so at most one page is requested beyond the page
/// holding the last counted release. An empty page ends the listing.
pub fn collect_releases<F>(count: usize, mut fetch_page: F) -> Result<Vec<Release>, DownloadError>
where
    F: FnMut(u32) -> Result<Vec<GithubRelease>, DownloadError>,
{
    let mut releases = Vec::new();
    let mut stable = 0;
    let mut page = 1;

    while stable < count {
        let entries = fetch_page(page)?;
        if entries.is_empty() {
            debug!(page, "release listing exhausted");
            break;
        }

        for entry in entries {
            let release = Release::from(entry);
            if !release.prerelease {
                stable += 1;
            }
            releases.push(release);
            if stable >= count {
                break;
            }
        }

        page += 1;
    }

    Ok(releases)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use mockito::Matcher;

    use super::*;

    fn entry(tag: &str, prerelease: bool) -> GithubRelease {
        GithubRelease {
            name: Some(format!("Release {tag}")),
            tag_name: tag.to_string(),
            prerelease,
            published_at: Some("2024-01-01T00:00:00Z".to_string()),
            assets: vec![GithubAsset {
                name: format!("app-{tag}.zip"),
                browser_download_url: format!("https://example.com/app-{tag}.zip"),
            }],
        }
    }

    #[test]
    fn test_release_from_github_release() {
        let release = Release::from(entry("v1.0.0", false));
        assert_eq!(release.name, "Release v1.0.0");
        assert_eq!(release.tag, "v1.0.0");
        assert_eq!(
            release.asset_url("app-v1.0.0.zip"),
            Some("https://example.com/app-v1.0.0.zip")
        );
        assert_eq!(release.published_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_draft_release_has_no_date() {
        let draft = GithubRelease {
            name: Some("Draft".to_string()),
            tag_name: "v3.0".to_string(),
            prerelease: false,
            published_at: None,
            assets: Vec::new(),
        };
        assert_eq!(Release::from(draft).published_at, None);
    }

    #[test]
    fn test_unnamed_release_uses_tag() {
        let mut unnamed = entry("v1.1", false);
        unnamed.name = None;
        assert_eq!(Release::from(unnamed).name, "v1.1");
    }

    #[test]
    fn test_collect_stops_at_count() {
        let pages = RefCell::new(Vec::new());
        let releases = collect_releases(2, |page| {
            pages.borrow_mut().push(page);
            Ok(vec![entry("v3", false), entry("v2", false), entry("v1", false)])
        })
        .unwrap();

        let tags: Vec<_> = releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["v3", "v2"]);
        assert_eq!(*pages.borrow(), vec![1]);
    }

    #[test]
    fn test_collect_prereleases_do_not_count() {
        let releases = collect_releases(1, |page| {
            Ok(match page {
                1 => vec![entry("v2-rc1", true), entry("v2-rc0", true)],
                2 => vec![entry("v1", false), entry("v0", false)],
                _ => vec![],
            })
        })
        .unwrap();

        let tags: Vec<_> = releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["v2-rc1", "v2-rc0", "v1"]);
        assert_eq!(releases.iter().filter(|r| !r.prerelease).count(), 1);
    }

    #[test]
    fn test_collect_stops_on_empty_page() {
        let pages = RefCell::new(Vec::new());
        let releases = collect_releases(10, |page| {
            pages.borrow_mut().push(page);
            Ok(if page == 1 {
                vec![entry("v1", false)]
            } else {
                vec![]
            })
        })
        .unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(*pages.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_collect_propagates_errors() {
        let result = collect_releases(1, |_| Err(DownloadError::InvalidResponse));
        assert!(matches!(result, Err(DownloadError::InvalidResponse)));
    }

    const PAGE_ONE: &str = r#"[
        {
            "name": "2024.1.0",
            "tag_name": "v2024.1.0",
            "prerelease": false,
            "published_at": "2024-01-02T00:00:00Z",
            "assets": [
                {"name": "install.zip", "browser_download_url": "https://example.com/install.zip", "size": 10}
            ]
        },
        {
            "name": null,
            "tag_name": "v2023.12.0-beta",
            "prerelease": true,
            "published_at": "2023-12-30T00:00:00Z",
            "assets": []
        }
    ]"#;

    #[test]
    fn test_fetch_releases_over_http() {
        let mut server = mockito::Server::new();
        let page_one = server
            .mock("GET", "/repos/ppy/osu/releases")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("accept", "application/vnd.github+json")
            .match_header("x-github-api-version", API_VERSION)
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PAGE_ONE)
            .create();

        let api_url = server.url();
        let releases = Github::new(&api_url)
            .token(Some("secret"))
            .fetch_releases("ppy", "osu", 1)
            .unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].version(), "2024.1.0");
        assert_eq!(
            releases[0].asset_url("install.zip"),
            Some("https://example.com/install.zip")
        );
        page_one.assert();
    }

    #[test]
    fn test_fetch_releases_without_token_sends_no_authorization() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/o/r/releases")
            .match_query(Matcher::Any)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create();

        let api_url = server.url();
        let releases = Github::new(&api_url)
            .token(None)
            .fetch_releases("o", "r", 3)
            .unwrap();

        assert!(releases.is_empty());
        mock.assert();
    }

    #[test]
    fn test_rate_limit_is_a_fetch_failure() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/o/r/releases")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create();

        let api_url = server.url();
        let err = Github::new(&api_url)
            .fetch_releases("o", "r", 1)
            .unwrap_err();
        assert!(matches!(err, DownloadError::HttpError { status: 403, .. }));
    }

    #[test]
    fn test_malformed_listing() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/o/r/releases")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create();

        let api_url = server.url();
        let err = Github::new(&api_url)
            .fetch_releases("o", "r", 1)
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidResponse));
    }
}
