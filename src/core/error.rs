//! Error types for provisioning and build launch.
//!
//! Every component reports its own error enum; [`Error`] aggregates them so the
//! pipeline and the CLI can treat any failure as fatal with one type.

use std::path::PathBuf;
use thiserror::Error;

/// Hasher failures. A missing file is not an error (see `hash::digest_file`).
#[derive(Error, Debug)]
pub enum HashError {
    #[error("integrity check failed: cannot read {path}: {source}")]
    IntegrityCheckFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mirror registry and URL rewriting failures.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("unknown GitHub mirror '{name}' (known: {})", .known.join(", "))]
    UnknownMirror { name: String, known: Vec<String> },

    #[error("malformed source URL (expected scheme://host/USER/REPO/BRANCH/FILE): {url}")]
    MalformedSourceUrl { url: String },

    #[error("invalid mirror registry: {0}")]
    InvalidRegistry(String),
}

/// Fetcher failures.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transfer failed for {url}: {reason}")]
    TransferFailure { url: String, reason: String },

    #[error(
        "downloaded file {path} is corrupt: expected {algorithm} {expected}, got {actual}"
    )]
    IntegrityMismatch {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Archive extractor failures.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("archive not found: {0}")]
    SourceArchiveMissing(PathBuf),

    #[error("archive entry escapes the destination directory: {0}")]
    UnsafeArchiveEntry(String),

    #[error("malformed archive {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Repository sync failures.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("failed to clone {remote}: {cause}")]
    CloneFailed { remote: String, cause: String },
}

/// Version manifest lookups.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Minecraft version '{version}' not found in the {source_name} manifest")]
    ResourceNotFound { version: String, source_name: String },

    #[error("request to {url} failed: {reason}")]
    Transfer { url: String, reason: String },

    #[error("unexpected response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Subprocess runner failures. A non-zero exit is not one of them.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

/// Pipeline driver failures; wraps whatever made the step fail.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<Error>,
    },

    #[error("step '{step}' finished but its artifact is still missing or invalid")]
    PostConditionFailed { step: String },

    #[error("cancelled before step '{step}'")]
    Cancelled { step: String },
}

/// Any failure that aborts the program.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("portable git installation failed: {0}")]
    ToolchainInstall(String),

    #[error("BuildTools exited with status {exit_code}")]
    SubprocessFailure { exit_code: i32 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Advice for the operator, looking through pipeline wrappers.
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            Self::Pipeline(PipelineError::StepFailed { source, .. }) => source.remediation_hint(),
            Self::Vcs(_) => Some(
                "Is your network connection working? Does the Gitee account host the requested repositories?",
            ),
            Self::SubprocessFailure { .. } => Some(
                "Different Minecraft versions need different Java versions to build; this is a likely cause.",
            ),
            Self::Fetch(FetchError::IntegrityMismatch { .. }) => Some(
                "The download was rejected and removed. Run again, or pick another mirror with --github-mirror.",
            ),
            Self::Fetch(FetchError::TransferFailure { .. }) => {
                Some("Check your connection or try another mirror with --github-mirror.")
            }
            Self::Manifest(ManifestError::ResourceNotFound { .. }) => {
                Some("Does this Minecraft version exist? Try --rev latest.")
            }
            Self::Mirror(MirrorError::UnknownMirror { .. }) => {
                Some("Run with --see-mirrors to list the known mirror names.")
            }
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
