// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git CLI invocation bound to one working directory.
//!
//! ```text
//! GitCommand { program, cwd, committer }
//!   .run(args)              blocking, used inside serializer jobs
//!   .run_async(args, token) tokio::process, killed on cancellation
//! ```
//!
//! ALWAYS sets `GCM_INTERACTIVE=never`, `GIT_TERMINAL_PROMPT=0` and `LC_ALL=C`
//! so error text can be matched reliably.

use std::path::{Path, PathBuf};
use std::process::Output;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{GitError, ProcessError, StoreError, StoreResult};

/// A git executable bound to a working directory.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: PathBuf,
    cwd: PathBuf,
    committer: Option<(String, String)>,
}

impl GitCommand {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cwd: cwd.into(),
            committer: None,
        }
    }

    /// Commit as `name <email>` regardless of the user's git config.
    #[must_use]
    pub fn with_committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer = Some((name.into(), email.into()));
        self
    }

    /// Resolve the git executable: an explicit path is taken as-is, otherwise
    /// `git` is looked up in PATH.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ExecutableNotFound` if `git` is not in PATH.
    pub fn resolve_program(explicit: Option<&Path>) -> Result<PathBuf, ProcessError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        which::which("git").map_err(|_| ProcessError::ExecutableNotFound {
            name: "git".to_string(),
        })
    }

    fn command_line(args: &[&str]) -> String {
        format!("git {}", args.join(" "))
    }

    fn configure(&self, command: &mut std::process::Command, args: &[&str]) {
        command
            .args(args)
            .current_dir(&self.cwd)
            .env("GCM_INTERACTIVE", "never")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");
        if let Some((name, email)) = &self.committer {
            command
                .env("GIT_COMMITTER_NAME", name)
                .env("GIT_COMMITTER_EMAIL", email);
        }
    }

    fn finish(args: &[&str], output: &Output) -> StoreResult<String> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(GitError::CommandFailed {
                command: Self::command_line(args),
                message: message.trim().to_string(),
            }
            .into());
        }
        trace!(cmd = %Self::command_line(args), bytes = output.stdout.len(), "git output");
        Ok(stdout.trim_end().to_string())
    }

    /// Run git and wait for it on the current thread.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::SpawnFailed` if git cannot be started and
    /// `GitError::CommandFailed` (carrying stderr, or stdout when stderr is
    /// empty) if it exits unsuccessfully.
    pub fn run(&self, args: &[&str]) -> StoreResult<String> {
        debug!(cwd = %self.cwd.display(), cmd = %Self::command_line(args), "exec");
        let mut command = std::process::Command::new(&self.program);
        self.configure(&mut command, args);
        let output = command.output().map_err(|source| ProcessError::SpawnFailed {
            command: Self::command_line(args),
            source,
        })?;
        Self::finish(args, &output)
    }

    /// Run git on the tokio runtime. The child is killed if `cancel` fires
    /// first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`], plus `StoreError::Cancelled`.
    pub async fn run_async(&self, args: &[&str], cancel: &CancellationToken) -> StoreResult<String> {
        debug!(cwd = %self.cwd.display(), cmd = %Self::command_line(args), "exec");
        let mut std_command = std::process::Command::new(&self.program);
        self.configure(&mut std_command, args);
        let mut command = tokio::process::Command::from(std_command);
        command.kill_on_drop(true);

        let output = tokio::select! {
            () = cancel.cancelled() => return Err(StoreError::Cancelled),
            output = command.output() => output.map_err(|source| ProcessError::SpawnFailed {
                command: Self::command_line(args),
                source,
            })?,
        };
        Self::finish(args, &output)
    }

    /// True if HEAD resolves to a commit.
    #[must_use]
    pub fn has_head(&self) -> bool {
        self.run(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
    }

    /// Async variant of [`Self::has_head`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Cancelled` if `cancel` fires; a failing lookup is
    /// reported as `Ok(false)`.
    pub async fn has_head_async(&self, cancel: &CancellationToken) -> StoreResult<bool> {
        match self.run_async(&["rev-parse", "--verify", "--quiet", "HEAD"], cancel).await {
            Ok(_) => Ok(true),
            Err(StoreError::Cancelled) => Err(StoreError::Cancelled),
            Err(_) => Ok(false),
        }
    }
}
