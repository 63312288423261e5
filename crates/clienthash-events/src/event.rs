use crate::OperationId;

/// All event types emitted while generating version hashes.
#[derive(Debug, Clone)]
pub enum HashEvent {
    /// A client's release history is about to be processed.
    ClientStarting {
        index: usize,
        total: usize,
        name: String,
        description: String,
        repository: String,
    },
    /// Fetching the release listing for a client failed; the client is skipped.
    ClientFailed { name: String, error: String },
    /// A release is about to be processed.
    ReleaseStarting {
        client: String,
        release_name: String,
        tag: String,
    },
    /// The resolved asset name is not attached to the release.
    AssetMissing {
        platform: String,
        asset_name: String,
    },
    /// The file declares an extraction type nobody handles.
    UnknownExtractor { platform: String, kind: String },
    /// Progress of a single platform extraction.
    Extraction {
        op_id: OperationId,
        platform: String,
        asset_name: String,
        stage: ExtractionStage,
    },
    /// A hash derived from the version tag instead of a downloaded file.
    SyntheticHash { platform: String, hash: String },
    /// A report document was written.
    ReportWritten { path: String, clients: usize },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Lifecycle of one platform extraction.
///
/// `Pending -> Downloading -> Extracting -> {Digested | Absent | Failed}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStage {
    /// Task created, nothing fetched yet.
    Pending,
    /// Streaming the asset from the network.
    Downloading,
    /// Locating the member inside the artifact.
    Extracting,
    /// The member was found and hashed.
    Digested { hash: String },
    /// The artifact does not contain the member.
    Absent { member: String },
    /// The extraction raised an error.
    Failed { error: String },
}

impl ExtractionStage {
    /// Whether no further stage follows this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Digested { .. } | Self::Absent { .. } | Self::Failed { .. }
        )
    }
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
