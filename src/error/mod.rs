// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!                  StoreError (~24 bytes)
//!                         |
//!   +------+------+-------+-------+------+------+------+
//!   |      |      |       |       |      |      |      |
//!   v      v      v       v       v      v      v      v
//! Bail   Blob    Git   Remote   Meta   Cfg   Proc   Serializer
//!        Box     Box    Box      Box    Box   Box    Box
//!
//! Sub-errors (unboxed internally):
//!   Blob       NotFound, InvalidKey
//!   Git        CommandFailed, MutationFailed, InvalidRevision
//!   Remote     UnexpectedStatus, MalformedBody, MalformedHeader, ...
//!   Metadata   InvalidTimestamp, MissingField
//!   Process    ExecutableNotFound, SpawnFailed
//!   Serializer WorkerGone, JobAbandoned
//!
//! Bailed   unrecoverable: retry budget spent, rollback failed
//! Cancelled  the caller's CancellationToken fired
//! ```

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`StoreError`].
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Top-level error type of every blob store operation.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unrecoverable condition. The caller decides whether to terminate.
    #[error("fatal error: {0}")]
    Bailed(Box<str>),

    /// The operation was cancelled before it could complete.
    #[error("operation cancelled")]
    Cancelled,

    /// Blob-level error (absent key, invalid key).
    #[error("blob error: {0}")]
    Blob(#[from] Box<BlobError>),

    /// Local git repository error.
    #[error("git error: {0}")]
    Git(#[from] Box<GitError>),

    /// Remote repository API error.
    #[error("remote error: {0}")]
    Remote(#[from] Box<RemoteError>),

    /// Commit metadata could not be normalized.
    #[error("metadata error: {0}")]
    Metadata(#[from] Box<MetadataError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Process execution error.
    #[error("process error: {0}")]
    Process(#[from] Box<ProcessError>),

    /// Job serializer error.
    #[error("serializer error: {0}")]
    Serializer(#[from] Box<SerializerError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

/// Create a fatal [`StoreError::Bailed`].
pub fn bail_out(message: impl Into<String>) -> StoreError {
    StoreError::Bailed(message.into().into_boxed_str())
}

impl StoreError {
    /// True for the NotFound class: an absent blob.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Blob(b) if matches!(**b, BlobError::NotFound { .. }))
    }

    /// True if the error is unrecoverable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Bailed(_))
    }
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for StoreError {
                fn from(err: $error) -> Self {
                    StoreError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    BlobError => Blob,
    GitError => Git,
    RemoteError => Remote,
    MetadataError => Metadata,
    ConfigError => Config,
    ProcessError => Process,
    SerializerError => Serializer,
    std::io::Error => Io,
}

// --- Blob Errors ---

/// Errors about a single blob.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob is stored under the key.
    #[error("blob not found: {key}")]
    NotFound { key: String },

    /// The key cannot be mapped to a flat file name.
    #[error("invalid blob key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

// --- Gix Errors ---

/// Wrapper for gix-specific errors.
#[derive(Debug, Error)]
pub enum GixError {
    /// Failed to open repository.
    #[error("failed to open repository: {0}")]
    Open(#[from] Box<gix::open::Error>),

    /// Repository has no worktree (bare repository).
    #[error("repository has no worktree (bare repository)")]
    BareRepository,
}

// --- Git Errors ---

/// Local git repository errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command execution failed.
    #[error("git command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// A step of a blob mutation failed; the working tree was rolled back.
    #[error("{operation} failed at '{step}' in {location}: {message}")]
    MutationFailed {
        operation: String,
        step: String,
        location: String,
        message: String,
    },

    /// A version token that cannot name a commit.
    #[error("invalid revision '{revision}'")]
    InvalidRevision { revision: String },

    /// The repository location exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// Error from gix library.
    #[error("gix error: {0}")]
    Gix(#[from] GixError),
}

// --- Remote Errors ---

/// Remote repository API errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with a status the operation does not accept.
    #[error("{operation} on {project}: unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: String,
        project: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("{operation}: malformed response body: {message}")]
    MalformedBody { operation: String, message: String },

    /// A blob arrived in an encoding other than base64.
    #[error("unexpected encoding '{encoding}' for blob {key}")]
    UnexpectedEncoding { key: String, encoding: String },

    /// A response header could not be parsed.
    #[error("malformed {header} header: '{value}'")]
    MalformedHeader { header: String, value: String },

    /// A required response header was absent.
    #[error("missing {header} header in response for {key}")]
    MissingHeader { header: String, key: String },

    /// No namespace owned by the token matches the configured path.
    #[error("no namespace found with path {path}")]
    NamespaceNotFound { path: String },

    /// The project has no commit on the configured branch.
    #[error("no commit yet in {project}")]
    NoCommits { project: String },

    /// The API URL could not be built.
    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    /// Commit failure requested through the simulation toggle.
    #[error("simulated commit failure")]
    SimulatedFailure,

    /// Error from reqwest library.
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

// --- Metadata Errors ---

/// Commit metadata normalization errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A date field is not a valid RFC 3339 timestamp.
    #[error("failed to parse time '{value}' as RFC3339: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A field the format always carries is absent.
    #[error("missing field '{0}' in commit metadata")]
    MissingField(&'static str),
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Process execution errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

// --- Serializer Errors ---

/// Job serializer errors.
#[derive(Debug, Error)]
pub enum SerializerError {
    /// The worker thread is gone; no job can be admitted.
    #[error("job worker is not running")]
    WorkerGone,

    /// The job was admitted but never reported completion (it panicked).
    #[error("job '{0}' did not complete")]
    JobAbandoned(String),

    /// The worker thread could not be started.
    #[error("failed to start job worker: {0}")]
    SpawnFailed(#[source] std::io::Error),
}
