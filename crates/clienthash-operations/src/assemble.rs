//! Per-client version assembly: fetch releases, fan out one extraction per platform,
//! merge the digests and add the synthetic mobile entries.

use clienthash_config::clients::ClientDescriptor;
use clienthash_dl::{github::Github, release::Release};
use clienthash_events::{next_op_id, EventSinkHandle, ExtractionStage, HashEvent, OperationId};
use clienthash_extract::{ExtractKind, ExtractStage};
use clienthash_utils::hash::digest_str;
use indexmap::IndexMap;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{
    context::HashContext,
    error::{HashGenError, Result},
    report::VersionRecord,
};

pub const ANDROID: &str = "Android";
pub const IOS: &str = "iOS";

/// Digest standing in for a platform that never ships a downloadable binary.
///
/// `version` is the tag with its leading `v` already removed.
pub fn synthetic_hash(version: &str, platform: &str) -> String {
    digest_str(&format!("{version}-{platform}"))
}

/// Builds the version records of `client`, one per fetched release, newest first.
///
/// # Errors
///
/// Only a failed release listing is an error; everything that goes wrong inside a single
/// release is reported through events and leaves the platform out of the record.
pub async fn assemble_versions(
    ctx: &HashContext,
    client: &ClientDescriptor,
) -> Result<Vec<VersionRecord>> {
    let releases = fetch_releases(ctx, client).await?;
    debug!(client = %client.name, releases = releases.len(), "fetched releases");

    let mut versions = Vec::with_capacity(releases.len());
    for release in &releases {
        versions.push(assemble_release(ctx, client, release).await);
    }

    Ok(versions)
}

async fn fetch_releases(ctx: &HashContext, client: &ClientDescriptor) -> Result<Vec<Release>> {
    let api_url = ctx.config().api_url().to_string();
    let token = ctx.token().map(str::to_string);
    let owner = client.owner.clone();
    let repo = client.repo.clone();
    let count = client.count;

    tokio::task::spawn_blocking(move || {
        Github::new(&api_url)
            .token(token.as_deref())
            .fetch_releases(&owner, &repo, count)
    })
    .await
    .map_err(|err| HashGenError::Custom(format!("Join handle error: {err}")))?
    .map_err(HashGenError::from)
}

/// Hashes every declared platform of one release.
///
/// All extractions are started before the first one is awaited. Results are merged in
/// declaration order, so a digest shared by two platforms keeps the later label.
pub async fn assemble_release(
    ctx: &HashContext,
    client: &ClientDescriptor,
    release: &Release,
) -> VersionRecord {
    ctx.events().emit(HashEvent::ReleaseStarting {
        client: client.name.clone(),
        release_name: release.name.clone(),
        tag: release.tag.clone(),
    });

    let mut pending = Vec::with_capacity(client.files.len());
    for (platform, file) in &client.files {
        let asset_name = file.resolve_asset_name(&release.tag);

        let Some(url) = release.asset_url(&asset_name) else {
            ctx.events().emit(HashEvent::AssetMissing {
                platform: platform.clone(),
                asset_name,
            });
            continue;
        };

        let Some(kind) = ExtractKind::from_tag(&file.kind) else {
            ctx.events().emit(HashEvent::UnknownExtractor {
                platform: platform.clone(),
                kind: file.kind.clone(),
            });
            continue;
        };

        pending.push(PendingExtraction::spawn(
            ctx,
            kind,
            platform,
            asset_name,
            url,
            &file.internal_name,
        ));
    }

    let mut hashes = IndexMap::new();
    for task in pending {
        if let Some((hash, platform)) = task.finish(ctx.events()).await {
            hashes.insert(hash, platform);
        }
    }

    let version = release.version().to_string();
    for (enabled, platform) in [(client.support_android, ANDROID), (client.support_ios, IOS)] {
        if !enabled {
            continue;
        }
        let hash = synthetic_hash(&version, platform);
        ctx.events().emit(HashEvent::SyntheticHash {
            platform: platform.to_string(),
            hash: hash.clone(),
        });
        hashes.insert(hash, platform.to_string());
    }

    VersionRecord {
        version,
        release_date: release.published_at.clone(),
        hashes,
    }
}

/// One platform extraction running on the blocking pool.
struct PendingExtraction {
    op_id: OperationId,
    platform: String,
    asset_name: String,
    member: String,
    handle: JoinHandle<clienthash_extract::error::Result<Option<String>>>,
}

impl PendingExtraction {
    fn spawn(
        ctx: &HashContext,
        kind: ExtractKind,
        platform: &str,
        asset_name: String,
        url: &str,
        member: &str,
    ) -> Self {
        let op_id = next_op_id();
        let events = ctx.events().clone();
        events.emit(HashEvent::Extraction {
            op_id,
            platform: platform.to_string(),
            asset_name: asset_name.clone(),
            stage: ExtractionStage::Pending,
        });

        let options = ctx.extract_options();
        let url = url.to_string();
        let task_member = member.to_string();
        let task_platform = platform.to_string();
        let task_asset = asset_name.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let on_stage = |stage: ExtractStage| {
                let stage = match stage {
                    ExtractStage::Downloading => ExtractionStage::Downloading,
                    ExtractStage::Extracting => ExtractionStage::Extracting,
                };
                events.emit(HashEvent::Extraction {
                    op_id,
                    platform: task_platform.clone(),
                    asset_name: task_asset.clone(),
                    stage,
                });
            };
            trace!(op_id, kind = %kind, url = %url, "starting extraction");
            kind.extract(&url, &task_member, &options, &on_stage)
        });

        Self {
            op_id,
            platform: platform.to_string(),
            asset_name,
            member: member.to_string(),
            handle,
        }
    }

    /// Waits for the task and reports its terminal stage.
    ///
    /// Returns `(hash, platform)` only when the member was found and digested.
    async fn finish(self, events: &EventSinkHandle) -> Option<(String, String)> {
        let (stage, found) = match self.handle.await {
            Ok(Ok(Some(hash))) => {
                (
                    ExtractionStage::Digested { hash: hash.clone() },
                    Some(hash),
                )
            }
            Ok(Ok(None)) => {
                (
                    ExtractionStage::Absent {
                        member: self.member,
                    },
                    None,
                )
            }
            Ok(Err(err)) => {
                debug!(op_id = self.op_id, error = ?err, "extraction failed");
                (
                    ExtractionStage::Failed {
                        error: err.to_string(),
                    },
                    None,
                )
            }
            Err(err) => {
                (
                    ExtractionStage::Failed {
                        error: format!("extraction task aborted: {err}"),
                    },
                    None,
                )
            }
        };

        events.emit(HashEvent::Extraction {
            op_id: self.op_id,
            platform: self.platform.clone(),
            asset_name: self.asset_name,
            stage,
        });

        found.map(|hash| (hash, self.platform))
    }
}
