// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only repository queries using gix.
//!
//! ```text
//! query.rs --> gix --> .git/ (no subprocess)
//! ```

use std::path::Path;

use gix::status::UntrackedFiles;

use crate::error::{GitError, GixError, StoreResult};

/// Check for uncommitted changes (staged, unstaged, or untracked files).
///
/// # Errors
///
/// Returns a `GitError` if the repository cannot be opened or the status
/// walk fails.
pub fn has_uncommitted_changes(path: &Path) -> StoreResult<bool> {
    let repo = gix::open(path).map_err(|e| GitError::Gix(GixError::Open(Box::new(e))))?;
    if repo.workdir().is_none() {
        return Err(GitError::Gix(GixError::BareRepository).into());
    }

    let has_changes = repo
        .status(gix::progress::Discard)
        .map_err(|_| GitError::CommandFailed {
            command: "status".to_string(),
            message: format!("failed to prepare status check in {}", path.display()),
        })?
        .untracked_files(UntrackedFiles::Files)
        .into_iter(None)
        .map_err(|_| GitError::CommandFailed {
            command: "status".to_string(),
            message: format!("failed to check repository status in {}", path.display()),
        })?
        .next()
        .is_some();

    Ok(has_changes)
}
