// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Blob and repository command handlers.
//!
//! Handlers are generic over [`BlobStore`] and write their results to the
//! given writer, so tests can drive them against either backend.

use std::io::Write;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::cli::blob::{AddArgs, CopyArgs, DeleteArgs, GetArgs, KeyArgs, MetadataArgs};
use crate::error::Result;
use crate::store::{BlobInfo, BlobStore};

/// Create the repository unless it exists.
///
/// # Errors
///
/// Returns an error if the backend fails to create the repository.
pub async fn run_create_command<S: BlobStore>(store: &S, cancel: &CancellationToken) -> Result<()> {
    store.create_repository(cancel).await?;
    tracing::info!("created {store}");
    Ok(())
}

/// Delete and recreate the repository.
///
/// # Errors
///
/// Returns an error if the backend fails to delete or create the repository.
pub async fn run_reset_command<S: BlobStore>(store: &S, cancel: &CancellationToken) -> Result<()> {
    store.reset_repository(cancel).await?;
    tracing::info!("reset {store}");
    Ok(())
}

/// Delete the repository.
///
/// # Errors
///
/// Returns an error if the backend fails to delete the repository.
pub async fn run_destroy_command<S: BlobStore>(store: &S, cancel: &CancellationToken) -> Result<()> {
    store.delete_repository(cancel).await?;
    tracing::info!("deleted {store}");
    Ok(())
}

/// Store a blob read from `--file` or stdin.
///
/// # Errors
///
/// Returns an error if the content cannot be read or the commit fails.
pub async fn run_add_command<S: BlobStore>(store: &S, args: &AddArgs, cancel: &CancellationToken) -> Result<()> {
    let content = match &args.file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };
    let blob = BlobInfo::new(&args.key, content, &args.user);
    store.add_blob(cancel, &blob).await?;
    tracing::info!(key = %args.key, bytes = blob.content.len(), "added blob");
    Ok(())
}

/// Copy a blob to another key.
///
/// # Errors
///
/// Returns an error if the source is missing or the commit fails.
pub async fn run_copy_command<S: BlobStore>(store: &S, args: &CopyArgs, cancel: &CancellationToken) -> Result<()> {
    store
        .copy_blob(cancel, &args.source, &args.destination, &args.user)
        .await?;
    tracing::info!(source = %args.source, destination = %args.destination, "copied blob");
    Ok(())
}

/// Write a blob to `--output` or `out`.
///
/// # Errors
///
/// Returns an error if the blob is missing or cannot be written.
pub async fn run_get_command<S: BlobStore, W: Write>(
    store: &S,
    args: &GetArgs,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    let content = store.get_blob(cancel, &args.key).await?;
    match &args.output {
        Some(path) => tokio::fs::write(path, &content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            out.write_all(&content)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Delete a blob.
///
/// # Errors
///
/// Returns an error if the blob is missing or the commit fails.
pub async fn run_delete_command<S: BlobStore>(store: &S, args: &DeleteArgs, cancel: &CancellationToken) -> Result<()> {
    store.delete_blob(cancel, &args.key, &args.user).await?;
    tracing::info!(key = %args.key, "deleted blob");
    Ok(())
}

/// Print every key, one per line, sorted.
///
/// # Errors
///
/// Returns an error if the keys cannot be listed.
pub async fn run_list_command<S: BlobStore, W: Write>(store: &S, cancel: &CancellationToken, out: &mut W) -> Result<()> {
    for key in store.list_blob_keys(cancel).await? {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

/// Print the current version.
///
/// # Errors
///
/// Returns an error if the repository has no commits.
pub async fn run_state_id_command<S: BlobStore, W: Write>(
    store: &S,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", store.get_state_id(cancel).await?)?;
    Ok(())
}

/// Print the version that last touched a key. Prints an empty line when
/// the key has no history.
///
/// # Errors
///
/// Returns an error if the history cannot be queried.
pub async fn run_version_for_command<S: BlobStore, W: Write>(
    store: &S,
    args: &KeyArgs,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", store.get_version_for(cancel, &args.key).await?)?;
    Ok(())
}

/// Print commit metadata as pretty JSON.
///
/// # Errors
///
/// Returns an error if the version is unknown or its metadata is malformed.
pub async fn run_metadata_command<S: BlobStore, W: Write>(
    store: &S,
    args: &MetadataArgs,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    let version = args.version.as_deref().unwrap_or_default();
    let metadata = store.get_version_metadata(cancel, version).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&metadata)?)?;
    Ok(())
}

/// Print `clean` or `dirty`; dirty is an error.
///
/// # Errors
///
/// Returns an error if the status cannot be determined or the repository
/// has uncommitted changes.
pub async fn run_status_command<S: BlobStore, W: Write>(
    store: &S,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    if store.check_status(cancel).await? {
        writeln!(out, "clean")?;
        Ok(())
    } else {
        writeln!(out, "dirty")?;
        anyhow::bail!("{store} has uncommitted changes")
    }
}
