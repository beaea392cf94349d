// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unified backend contract.
//!
//! ```text
//!                BlobStore (trait)
//!                /               \
//!               v                 v
//!     LocalRepository        RemoteRepository
//!     JobSerializer          ResourcePool<Client>
//!     git CLI + gix          GitLab REST API
//!               \                 /
//!                v               v
//!                 CommitMetadata
//! ```
//!
//! Every operation takes a [`CancellationToken`]; see the backend docs for
//! which steps honor it.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{BlobError, StoreResult};
use crate::metadata::CommitMetadata;

/// Opaque identifier of a commit. Empty means "no recorded version".
pub type VersionToken = String;

/// A named blob and the user who modifies it.
#[derive(Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub content: Vec<u8>,
    pub modified_by: String,
}

impl BlobInfo {
    pub fn new(key: impl Into<String>, content: impl Into<Vec<u8>>, modified_by: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            modified_by: modified_by.into(),
        }
    }
}

impl fmt::Debug for BlobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobInfo")
            .field("key", &self.key)
            .field("content_len", &self.content.len())
            .field("modified_by", &self.modified_by)
            .finish()
    }
}

/// Check that `key` names a single flat file.
///
/// # Errors
///
/// Returns `BlobError::InvalidKey` for empty keys, `.`/`..`, and keys
/// containing a path separator or NUL.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key == "." || key == ".." {
        "key is a relative path component"
    } else if key.contains('/') {
        "invalid character in key: forward slash ('/')"
    } else if key.contains('\\') {
        "invalid character in key: backslash ('\\')"
    } else if key.contains('\0') {
        "invalid character in key: NUL"
    } else {
        return Ok(());
    };
    Err(BlobError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

/// Operations both backends implement identically from the caller's view.
pub trait BlobStore: fmt::Display + Send + Sync {
    /// Create the repository unless it already exists.
    fn create_repository(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<()>> + Send;

    /// Delete then create. A failed delete is fatal and not retried.
    fn reset_repository(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<()>> + Send;

    /// Delete the repository; deleting an absent repository succeeds.
    fn delete_repository(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<()>> + Send;

    /// Store `blob` and commit it as `blob.modified_by`.
    fn add_blob(&self, cancel: &CancellationToken, blob: &BlobInfo) -> impl Future<Output = StoreResult<()>> + Send;

    /// Copy the content of `source` to `destination` in one commit.
    fn copy_blob(
        &self,
        cancel: &CancellationToken,
        source: &str,
        destination: &str,
        modified_by: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove `key` in one commit. An absent key is a NotFound error.
    fn delete_blob(
        &self,
        cancel: &CancellationToken,
        key: &str,
        modified_by: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Content stored under `key`.
    fn get_blob(&self, cancel: &CancellationToken, key: &str) -> impl Future<Output = StoreResult<Vec<u8>>> + Send;

    /// Every key in the current version. Order carries no meaning.
    fn list_blob_keys(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<BTreeSet<String>>> + Send;

    /// The current version of the whole store.
    fn get_state_id(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<VersionToken>> + Send;

    /// The version that last touched `key`, or an empty token.
    fn get_version_for(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> impl Future<Output = StoreResult<VersionToken>> + Send;

    /// Provenance of `version`.
    fn get_version_metadata(
        &self,
        cancel: &CancellationToken,
        version: &str,
    ) -> impl Future<Output = StoreResult<CommitMetadata>> + Send;

    /// True iff the persisted state matches the last commit exactly.
    fn check_status(&self, cancel: &CancellationToken) -> impl Future<Output = StoreResult<bool>> + Send;
}

#[cfg(test)]
mod tests;
