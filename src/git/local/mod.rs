// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Blob store over a local git working directory.
//!
//! ```text
//! add/copy/delete ──> JobSerializer ──> apply file op
//!                                          |
//!                                          v
//!                                      git add -A
//!                                          |
//!                                          v
//!                              git commit -m "<msg> by <user>"
//!                                          |
//!                                 any step fails?
//!                                          |
//!                                          v
//!                     reset --hard HEAD (read-tree --empty if no HEAD)
//!                                   clean -qfdx
//!
//! get/list/version queries ──> git CLI (async) / gix, not serialized
//! ```
//!
//! One blob is one file directly under the repository root; keys starting
//! with `.git` are reserved. Handles on one location share a serializer.
//! Mutations are skipped if cancelled before they start; once started they
//! run to completion, rollback included. Queries are cancelled mid-flight.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, error, info, warn};

use crate::config::types::LocalConfig;
use crate::error::{BlobError, ConfigError, GitError, StoreError, StoreResult, bail_out};
use crate::git::cmd::GitCommand;
use crate::git::query::has_uncommitted_changes;
use crate::git::serializer::JobSerializer;
use crate::metadata::{CommitMetadata, MetadataFormat};
use crate::store::{BlobInfo, BlobStore, VersionToken, validate_key};

/// Git verb used instead of `commit` while failure simulation is on.
pub const SIMULATED_COMMIT_VERB: &str = "procyon lotor";

/// Marker in `git init` output for a location that cannot hold a repository.
const NOT_A_REPOSITORY: &str = "not a git repository";

/// Name of the worker thread serializing jobs for one location.
const SERIALIZER_NAME: &str = "vcblob-local";

/// One commit-producing change to the working tree.
struct Mutation {
    operation: String,
    message: &'static str,
    modified_by: String,
    simulate: bool,
}

/// The part of a repository handle that runs on the serializer thread.
#[derive(Debug, Clone)]
struct Worker {
    location: PathBuf,
    git: GitCommand,
}

impl Worker {
    fn location_has_repo(&self) -> StoreResult<bool> {
        match fs::metadata(&self.location) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
            Ok(meta) if !meta.is_dir() => {
                return Err(GitError::NotADirectory {
                    path: self.location.display().to_string(),
                }
                .into());
            }
            Ok(_) => {}
        }

        match self.git.run(&["init"]) {
            Ok(_) => Ok(true),
            Err(err) if err.to_string().contains(NOT_A_REPOSITORY) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn create_and_initialize(&self) -> StoreResult<()> {
        self.delete()?;
        create_private_dir(&self.location)?;
        self.git.run(&["init"])?;
        info!(location = %self.location.display(), "initialized git repository");
        Ok(())
    }

    fn init_maybe(&self) -> StoreResult<()> {
        if self.location_has_repo()? {
            debug!(location = %self.location.display(), "repository already present");
            return Ok(());
        }
        self.create_and_initialize()
    }

    fn delete(&self) -> StoreResult<()> {
        match fs::remove_dir_all(&self.location) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn run_mutation<F>(&self, mutation: &Mutation, apply: F) -> StoreResult<()>
    where
        F: FnOnce() -> StoreResult<()>,
    {
        let span = debug_span!(
            "mutation",
            operation = %mutation.operation,
            location = %self.location.display()
        );
        let _enter = span.enter();

        if mutation.modified_by.is_empty() {
            warn!("modifying user is not specified");
        }

        let Err(err) = apply().and_then(|()| self.commit_all(mutation)) else {
            debug!("mutation committed");
            return Ok(());
        };

        debug!(error = %err, "mutation failed, rolling back");
        if let Err(rollback_err) = self.rollback() {
            error!(error = %rollback_err, "rollback failed");
            return Err(bail_out(format!(
                "rollback after failed {} in {} failed: {rollback_err} (original error: {err})",
                mutation.operation,
                self.location.display()
            )));
        }
        Err(err)
    }

    fn commit_all(&self, mutation: &Mutation) -> StoreResult<()> {
        self.git
            .run(&["add", "-A"])
            .map_err(|e| self.step_failed(mutation, "add", &e))?;

        let verb = if mutation.simulate {
            SIMULATED_COMMIT_VERB
        } else {
            "commit"
        };
        let message = format!("{} by {}", mutation.message, mutation.modified_by);
        let author = format!("--author={0} <{0}>", mutation.modified_by);
        self.git
            .run(&[verb, "-m", &message, &author])
            .map_err(|e| self.step_failed(mutation, "commit", &e))?;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        if self.git.has_head() {
            self.git.run(&["reset", "--hard", "HEAD"])?;
        } else {
            self.git.run(&["read-tree", "--empty"])?;
        }
        self.git.run(&["clean", "-qfdx"])?;
        debug!("working tree restored");
        Ok(())
    }

    fn step_failed(&self, mutation: &Mutation, step: &str, err: &impl fmt::Display) -> StoreError {
        GitError::MutationFailed {
            operation: mutation.operation.clone(),
            step: step.to_string(),
            location: self.location.display().to_string(),
            message: err.to_string(),
        }
        .into()
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

fn create_private_file(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn write_blob_file(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        create_private_dir(parent)?;
    }
    let mut file = create_private_file(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn copy_blob_file(source: &Path, destination: &Path) -> io::Result<()> {
    let mut input = fs::File::open(source)?;
    let mut output = create_private_file(destination)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()
}

fn file_op_failed(operation: &str, step: &str, path: &Path, location: &Path, err: &io::Error) -> StoreError {
    GitError::MutationFailed {
        operation: operation.to_string(),
        step: step.to_string(),
        location: location.display().to_string(),
        message: format!("{}: {err}", path.display()),
    }
    .into()
}

fn not_found(key: &str) -> StoreError {
    BlobError::NotFound {
        key: key.to_string(),
    }
    .into()
}

/// Version tokens name commits by their full or abbreviated hex id.
fn validate_revision(version: &str) -> StoreResult<()> {
    if !version.is_empty() && version.len() <= 64 && version.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(());
    }
    Err(GitError::InvalidRevision {
        revision: version.to_string(),
    }
    .into())
}

/// A versioned blob store in a local git working directory.
#[derive(Debug)]
pub struct LocalRepository {
    worker: Worker,
    serializer: Arc<JobSerializer>,
    metadata_format: MetadataFormat,
    simulate_commit_failure: AtomicBool,
}

impl LocalRepository {
    /// Bind a handle to `config.location`, sharing `serializer` with any
    /// other handle it was given to.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` without a location and
    /// `ProcessError::ExecutableNotFound` if git cannot be found.
    pub fn new(config: &LocalConfig, serializer: Arc<JobSerializer>) -> StoreResult<Self> {
        let location = config.location.clone().ok_or_else(|| ConfigError::MissingKey {
            section: "local".to_string(),
            key: "location".to_string(),
        })?;
        let program = GitCommand::resolve_program(config.git_program.as_deref())?;
        let git = GitCommand::new(program, &location)
            .with_committer(&config.committer_name, &config.committer_email);

        Ok(Self {
            worker: Worker { location, git },
            serializer,
            metadata_format: config.metadata_format,
            simulate_commit_failure: AtomicBool::new(config.simulate_commit_failure),
        })
    }

    /// Bind a handle that shares the serializer of every other open handle
    /// on the same location.
    ///
    /// # Errors
    ///
    /// See [`Self::new`]; also fails if the worker thread cannot start.
    pub fn open(config: &LocalConfig) -> StoreResult<Self> {
        let location = config.location.as_deref().ok_or_else(|| ConfigError::MissingKey {
            section: "local".to_string(),
            key: "location".to_string(),
        })?;
        Self::new(config, JobSerializer::for_location(SERIALIZER_NAME, location)?)
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.worker.location
    }

    #[must_use]
    pub fn serializer(&self) -> &Arc<JobSerializer> {
        &self.serializer
    }

    /// Swap the commit step for an invalid git verb.
    pub fn set_simulate_commit_failure(&self, simulate: bool) {
        self.simulate_commit_failure.store(simulate, Ordering::SeqCst);
    }

    /// Probe whether the location holds a repository by running `git init`
    /// in it; a missing location holds none.
    ///
    /// # Errors
    ///
    /// Returns `GitError::NotADirectory` if the location is a file, or the
    /// git failure if the probe fails for another reason.
    pub async fn location_has_repo(&self) -> StoreResult<bool> {
        let worker = self.worker.clone();
        self.serializer
            .submit("probe repository", move || worker.location_has_repo())
            .await?
    }

    fn path_to_file(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        if key.starts_with(".git") {
            return Err(BlobError::InvalidKey {
                key: key.to_string(),
                reason: "reserved by the repository".to_string(),
            }
            .into());
        }
        Ok(self.worker.location.join(key))
    }

    async fn lifecycle<T, F>(&self, cancel: &CancellationToken, label: &str, job: F) -> StoreResult<T>
    where
        F: FnOnce(&Worker) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let worker = self.worker.clone();
        let cancel = cancel.clone();
        self.serializer
            .submit(label, move || {
                if cancel.is_cancelled() {
                    return Err(StoreError::Cancelled);
                }
                job(&worker)
            })
            .await?
    }

    async fn mutate<F>(&self, cancel: &CancellationToken, mutation: Mutation, apply: F) -> StoreResult<()>
    where
        F: FnOnce() -> StoreResult<()> + Send + 'static,
    {
        let label = mutation.operation.clone();
        self.lifecycle(cancel, &label, move |worker| worker.run_mutation(&mutation, apply))
            .await
    }

    fn mutation(&self, operation: impl Into<String>, message: &'static str, modified_by: &str) -> Mutation {
        Mutation {
            operation: operation.into(),
            message,
            modified_by: modified_by.to_string(),
            simulate: self.simulate_commit_failure.load(Ordering::SeqCst),
        }
    }
}

impl fmt::Display for LocalRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Local git repository at {}", self.worker.location.display())
    }
}

impl BlobStore for LocalRepository {
    async fn create_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        self.lifecycle(cancel, "create repository", Worker::init_maybe).await
    }

    async fn reset_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        self.lifecycle(cancel, "reset repository", |worker| {
            if let Err(err) = worker.delete() {
                return Err(bail_out(format!(
                    "failed to delete repository at {} during reset: {err}",
                    worker.location.display()
                )));
            }
            worker.init_maybe()
        })
        .await
    }

    async fn delete_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        self.lifecycle(cancel, "delete repository", Worker::delete).await
    }

    async fn add_blob(&self, cancel: &CancellationToken, blob: &BlobInfo) -> StoreResult<()> {
        let path = self.path_to_file(&blob.key)?;
        let content = blob.content.clone();
        let location = self.worker.location.clone();
        debug!(key = %blob.key, bytes = content.len(), "add blob");

        let mutation = self.mutation("add blob file", "blob file version added", &blob.modified_by);
        self.mutate(cancel, mutation, move || {
            write_blob_file(&path, &content)
                .map_err(|e| file_op_failed("add blob file", "write", &path, &location, &e))
        })
        .await
    }

    async fn copy_blob(
        &self,
        cancel: &CancellationToken,
        source: &str,
        destination: &str,
        modified_by: &str,
    ) -> StoreResult<()> {
        let source_path = self.path_to_file(source)?;
        let destination_path = self.path_to_file(destination)?;
        let source_key = source.to_string();
        let location = self.worker.location.clone();
        debug!(source, destination, "copy blob");

        let mutation = self.mutation("copy blob file", "blob file version added", modified_by);
        self.mutate(cancel, mutation, move || {
            copy_blob_file(&source_path, &destination_path).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound && !source_path.exists() {
                    not_found(&source_key)
                } else {
                    file_op_failed("copy blob file", "copy", &destination_path, &location, &e)
                }
            })
        })
        .await
    }

    async fn delete_blob(&self, cancel: &CancellationToken, key: &str, modified_by: &str) -> StoreResult<()> {
        let path = self.path_to_file(key)?;
        let owned_key = key.to_string();
        let location = self.worker.location.clone();
        debug!(key, "delete blob");

        let mutation = self.mutation(format!("delete blob {key}"), "blob deleted", modified_by);
        self.mutate(cancel, mutation, move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(&owned_key)),
            Err(e) => Err(file_op_failed("delete blob", "remove", &path, &location, &e)),
        })
        .await
    }

    async fn get_blob(&self, cancel: &CancellationToken, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_to_file(key)?;
        let read = tokio::select! {
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            read = tokio::fs::read(&path) => read,
        };
        match read {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_blob_keys(&self, cancel: &CancellationToken) -> StoreResult<BTreeSet<String>> {
        let git = &self.worker.git;
        if !git.has_head_async(cancel).await? {
            return Ok(BTreeSet::new());
        }
        let output = git.run_async(&["ls-tree", "-r", "-z", "HEAD", "--name-only"], cancel).await?;
        Ok(output
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn get_state_id(&self, cancel: &CancellationToken) -> StoreResult<VersionToken> {
        self.worker.git.run_async(&["rev-parse", "HEAD"], cancel).await
    }

    async fn get_version_for(&self, cancel: &CancellationToken, key: &str) -> StoreResult<VersionToken> {
        self.path_to_file(key)?;
        let git = &self.worker.git;
        if !git.has_head_async(cancel).await? {
            return Ok(VersionToken::new());
        }
        git.run_async(
            &["--literal-pathspecs", "log", "-n", "1", "--pretty=format:%H", "--", key],
            cancel,
        )
        .await
    }

    async fn get_version_metadata(&self, cancel: &CancellationToken, version: &str) -> StoreResult<CommitMetadata> {
        let mut args: Vec<&str> = self.metadata_format.show_args();
        if !version.is_empty() {
            validate_revision(version)?;
            args.push(version);
        }
        let output = self.worker.git.run_async(&args, cancel).await?;
        debug!(version, bytes = output.len(), "raw commit metadata");
        Ok(self.metadata_format.parse(&output)?)
    }

    async fn check_status(&self, cancel: &CancellationToken) -> StoreResult<bool> {
        let location = self.worker.location.clone();
        let status = tokio::task::spawn_blocking(move || has_uncommitted_changes(&location));
        let dirty = tokio::select! {
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            joined = status => joined.map_err(|e| StoreError::Other(e.to_string().into_boxed_str()))??,
        };
        Ok(!dirty)
    }
}
