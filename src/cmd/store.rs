// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Backend selected by `store.backend`.
//!
//! ```text
//! Config --> Backend::open --> Local(LocalRepository)
//!                          \-> Remote(RemoteRepository)
//! ```

use std::collections::BTreeSet;
use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::config::types::BackendKind;
use crate::error::StoreResult;
use crate::git::local::LocalRepository;
use crate::metadata::CommitMetadata;
use crate::remote::RemoteRepository;
use crate::store::{BlobInfo, BlobStore, VersionToken};

/// Either backend behind one [`BlobStore`] impl.
#[derive(Debug)]
pub enum Backend {
    Local(LocalRepository),
    Remote(RemoteRepository),
}

impl Backend {
    /// Open the backend named by `config.store.backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local repository cannot be set up or the
    /// remote namespace cannot be resolved.
    pub async fn open(config: &Config, cancel: &CancellationToken) -> StoreResult<Self> {
        let backend = match config.store.backend {
            BackendKind::Local => Self::Local(LocalRepository::open(&config.local)?),
            BackendKind::Remote => Self::Remote(RemoteRepository::connect(&config.remote, cancel).await?),
        };
        tracing::debug!(backend = %backend, "opened blob store");
        Ok(backend)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(repo) => fmt::Display::fmt(repo, f),
            Self::Remote(repo) => fmt::Display::fmt(repo, f),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            Backend::Local($repo) => $call.await,
            Backend::Remote($repo) => $call.await,
        }
    };
}

impl BlobStore for Backend {
    async fn create_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        delegate!(self, repo => repo.create_repository(cancel))
    }

    async fn reset_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        delegate!(self, repo => repo.reset_repository(cancel))
    }

    async fn delete_repository(&self, cancel: &CancellationToken) -> StoreResult<()> {
        delegate!(self, repo => repo.delete_repository(cancel))
    }

    async fn add_blob(&self, cancel: &CancellationToken, blob: &BlobInfo) -> StoreResult<()> {
        delegate!(self, repo => repo.add_blob(cancel, blob))
    }

    async fn copy_blob(
        &self,
        cancel: &CancellationToken,
        source: &str,
        destination: &str,
        modified_by: &str,
    ) -> StoreResult<()> {
        delegate!(self, repo => repo.copy_blob(cancel, source, destination, modified_by))
    }

    async fn delete_blob(&self, cancel: &CancellationToken, key: &str, modified_by: &str) -> StoreResult<()> {
        delegate!(self, repo => repo.delete_blob(cancel, key, modified_by))
    }

    async fn get_blob(&self, cancel: &CancellationToken, key: &str) -> StoreResult<Vec<u8>> {
        delegate!(self, repo => repo.get_blob(cancel, key))
    }

    async fn list_blob_keys(&self, cancel: &CancellationToken) -> StoreResult<BTreeSet<String>> {
        delegate!(self, repo => repo.list_blob_keys(cancel))
    }

    async fn get_state_id(&self, cancel: &CancellationToken) -> StoreResult<VersionToken> {
        delegate!(self, repo => repo.get_state_id(cancel))
    }

    async fn get_version_for(&self, cancel: &CancellationToken, key: &str) -> StoreResult<VersionToken> {
        delegate!(self, repo => repo.get_version_for(cancel, key))
    }

    async fn get_version_metadata(&self, cancel: &CancellationToken, version: &str) -> StoreResult<CommitMetadata> {
        delegate!(self, repo => repo.get_version_metadata(cancel, version))
    }

    async fn check_status(&self, cancel: &CancellationToken) -> StoreResult<bool> {
        delegate!(self, repo => repo.check_status(cancel))
    }
}
