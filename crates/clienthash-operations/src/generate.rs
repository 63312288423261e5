//! Run orchestration over the default client set and the community sets.

use std::path::{Path, PathBuf};

use clienthash_config::clients::{load_clients, ClientDescriptor};
use clienthash_events::{HashEvent, LogLevel};
use clienthash_utils::fs::files_with_extension;
use tracing::{debug, warn};

use crate::{
    assemble::assemble_versions,
    context::HashContext,
    error::Result,
    report::{write_report, ClientVersionList},
};

/// Which client sets a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSelection {
    pub default: bool,
    pub community: bool,
}

impl ClientSelection {
    /// Both sets are selected when neither flag is set.
    pub fn from_flags(default: bool, community: bool) -> Self {
        if !default && !community {
            return Self {
                default: true,
                community: true,
            };
        }
        Self {
            default,
            community,
        }
    }
}

/// Version lists of the clients that could be processed, plus the ones that could not.
#[derive(Debug, Default)]
pub struct GeneratedLists {
    pub lists: Vec<ClientVersionList>,
    pub failed: Vec<String>,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Every report written, in the order they were written.
    pub reports: Vec<PathBuf>,
    /// Clients whose release listing could not be fetched.
    pub failed_clients: Vec<String>,
    /// Community documents that could not be loaded.
    pub skipped_sets: Vec<PathBuf>,
}

/// Builds the version list of every client in order, one client at a time.
///
/// A client whose releases cannot be listed is reported and left out; the remaining
/// clients are still processed.
pub async fn generate_version_list(
    ctx: &HashContext,
    clients: &[ClientDescriptor],
) -> GeneratedLists {
    let mut generated = GeneratedLists::default();
    let total = clients.len();

    for (index, client) in clients.iter().enumerate() {
        ctx.events().emit(HashEvent::ClientStarting {
            index: index + 1,
            total,
            name: client.name.clone(),
            description: client.description.clone(),
            repository: client.repository(),
        });

        match assemble_versions(ctx, client).await {
            Ok(versions) => {
                generated.lists.push(ClientVersionList {
                    name: client.name.clone(),
                    versions,
                });
            }
            Err(err) => {
                warn!(client = %client.name, error = ?err, "failed to fetch releases");
                ctx.events().emit(HashEvent::ClientFailed {
                    name: client.name.clone(),
                    error: err.to_string(),
                });
                generated.failed.push(client.name.clone());
            }
        }
    }

    generated
}

/// Processes the selected client sets and writes one report per set.
///
/// # Errors
///
/// Fails when the default client document cannot be loaded or a report cannot be
/// written. Unloadable community documents are skipped.
pub async fn run(ctx: &HashContext, selection: ClientSelection) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    if selection.default {
        let clients = load_clients(ctx.config().clients_file())?;
        let output = ctx.config().output_file();
        process_set(ctx, &clients, &output, &mut summary).await?;
    }

    if selection.community {
        run_community(ctx, &mut summary).await?;
    }

    Ok(summary)
}

async fn run_community(ctx: &HashContext, summary: &mut RunSummary) -> Result<()> {
    let dir = ctx.config().community_dir();
    if !dir.is_dir() {
        ctx.log(
            LogLevel::Warning,
            format!("Community directory {} not found, skipping", dir.display()),
        );
        return Ok(());
    }

    let output_dir = ctx.config().community_output_dir();
    for source in files_with_extension(&dir, "json")? {
        let clients = match load_clients(&source) {
            Ok(clients) => clients,
            Err(err) => {
                ctx.log(
                    LogLevel::Error,
                    format!("Skipping community set {}: {err}", source.display()),
                );
                summary.skipped_sets.push(source);
                continue;
            }
        };

        let Some(file_name) = source.file_name() else {
            continue;
        };
        let output = output_dir.join(file_name);
        debug!(source = %source.display(), output = %output.display(), "processing community set");
        process_set(ctx, &clients, &output, summary).await?;
    }

    Ok(())
}

async fn process_set(
    ctx: &HashContext,
    clients: &[ClientDescriptor],
    output: &Path,
    summary: &mut RunSummary,
) -> Result<()> {
    let generated = generate_version_list(ctx, clients).await;
    write_report(output, &generated.lists)?;

    ctx.events().emit(HashEvent::ReportWritten {
        path: output.display().to_string(),
        clients: generated.lists.len(),
    });

    summary.reports.push(output.to_path_buf());
    summary.failed_clients.extend(generated.failed);
    Ok(())
}
