use std::{sync::mpsc::Receiver, thread::JoinHandle};

use clienthash_events::{ExtractionStage, HashEvent, LogLevel};
use nu_ansi_term::Color::{Cyan, Green, Yellow};
use tracing::{debug, error, info, warn};

use crate::utils::Colored;

/// Handle returned by [`spawn_event_handler`] that owns the background console thread.
///
/// Call [`finish`](ProgressGuard::finish) after dropping the
/// [`HashContext`](clienthash_operations::HashContext) so the channel closes.
pub struct ProgressGuard {
    handle: Option<JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler thread to drain the remaining events.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// The console line for an event.
fn render(event: &HashEvent) -> (Severity, String) {
    match event {
        HashEvent::ClientStarting {
            index,
            total,
            name,
            description,
            repository,
        } => {
            (
                Severity::Info,
                format!(
                    "--- ({index}/{total}) Generating version for ---\n\
                     \tClient: {}\n\
                     \tDescription: {description}\n\
                     \tRepository: {repository}",
                    Colored(Cyan, name)
                ),
            )
        }
        HashEvent::ClientFailed {
            name,
            error,
        } => {
            (
                Severity::Error,
                format!("\t[!] Could not list releases of {name}: {error}"),
            )
        }
        HashEvent::ReleaseStarting {
            release_name,
            tag,
            ..
        } => (Severity::Info, format!("\t  Release: {release_name} ({tag})")),
        HashEvent::AssetMissing {
            asset_name, ..
        } => {
            (
                Severity::Info,
                format!(
                    "\t    {} Asset '{asset_name}' not found in release.",
                    Colored(Yellow, "[!]")
                ),
            )
        }
        HashEvent::UnknownExtractor {
            kind, ..
        } => {
            (
                Severity::Info,
                format!(
                    "\t    {} No processor found for type '{kind}'.",
                    Colored(Yellow, "[!]")
                ),
            )
        }
        HashEvent::Extraction {
            op_id,
            platform,
            asset_name,
            stage,
        } => {
            match stage {
                ExtractionStage::Pending => {
                    (Severity::Info, format!("\t    Processing asset: {asset_name}"))
                }
                ExtractionStage::Downloading | ExtractionStage::Extracting => {
                    (
                        Severity::Debug,
                        format!("[{op_id}] {asset_name} ({platform}): {stage:?}"),
                    )
                }
                ExtractionStage::Digested {
                    hash,
                } => {
                    (
                        Severity::Info,
                        format!("\t      {platform} version hash: {}", Colored(Green, hash)),
                    )
                }
                ExtractionStage::Absent {
                    member,
                } => {
                    (
                        Severity::Info,
                        format!(
                            "\t      {} Internal file '{member}' not found in asset.",
                            Colored(Yellow, "[!]")
                        ),
                    )
                }
                ExtractionStage::Failed {
                    error,
                } => {
                    (
                        Severity::Error,
                        format!("\t      [!] Error processing file {asset_name}: {error}"),
                    )
                }
            }
        }
        HashEvent::SyntheticHash {
            platform,
            hash,
        } => {
            (
                Severity::Info,
                format!("\t      {platform} version hash: {}", Colored(Green, hash)),
            )
        }
        HashEvent::ReportWritten {
            path, ..
        } => {
            (
                Severity::Info,
                format!("--- Version list generated, output to {path} ---"),
            )
        }
        HashEvent::Log {
            level,
            message,
        } => {
            let severity = match level {
                LogLevel::Debug => Severity::Debug,
                LogLevel::Info => Severity::Info,
                LogLevel::Warning => Severity::Warn,
                LogLevel::Error => Severity::Error,
            };
            (severity, message.clone())
        }
    }
}

/// Spawns a thread that prints every [`HashEvent`] until the sending side is dropped.
pub fn spawn_event_handler(receiver: Receiver<HashEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        while let Ok(event) = receiver.recv() {
            let (severity, line) = render(&event);
            match severity {
                Severity::Debug => debug!("{line}"),
                Severity::Info => info!("{line}"),
                Severity::Warn => warn!("{line}"),
                Severity::Error => error!("{line}"),
            }
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
