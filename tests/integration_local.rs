// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for the local git backend.
//!
//! These tests run the real git executable in temporary directories.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vcblob::config::types::LocalConfig;
use vcblob::git::local::LocalRepository;
use vcblob::git::serializer::JobSerializer;
use vcblob::store::{BlobInfo, BlobStore};

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn config_at(location: &Path) -> LocalConfig {
    LocalConfig {
        location: Some(location.to_path_buf()),
        ..LocalConfig::default()
    }
}

async fn empty_repo(dir: &TempDir) -> LocalRepository {
    let repo = LocalRepository::open(&config_at(&dir.path().join("blobs"))).unwrap();
    repo.create_repository(&CancellationToken::new()).await.unwrap();
    repo
}

fn random_content(len: usize) -> Vec<u8> {
    let mut content = vec![0u8; len];
    rand::rng().fill(&mut content[..]);
    content
}

// =============================================================================
// Single blob
// =============================================================================

#[tokio::test]
async fn test_add_to_empty_repository() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    let content = random_content(4096);
    let issued = Utc::now();
    repo.add_blob(&cancel, &BlobInfo::new("metro-zazie", content.clone(), "ux"))
        .await
        .unwrap();

    let state = repo.get_state_id(&cancel).await.unwrap();
    assert_eq!(state.len(), 40);
    assert!(repo.check_status(&cancel).await.unwrap());
    assert_eq!(repo.get_blob(&cancel, "metro-zazie").await.unwrap(), content);

    let version = repo.get_version_for(&cancel, "metro-zazie").await.unwrap();
    assert_eq!(version, state);

    let metadata = repo.get_version_metadata(&cancel, &version).await.unwrap();
    let drift = metadata.commit_date.signed_duration_since(issued);
    assert!(drift.num_seconds().abs() <= 1, "commit date drifted by {drift}");
    assert_eq!(metadata.author, "ux <ux>");
}

#[tokio::test]
async fn test_each_commit_changes_state() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("metro-zazie", random_content(4096), "ux"))
        .await
        .unwrap();
    let first = repo.get_state_id(&cancel).await.unwrap();

    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", random_content(512), "ux"))
        .await
        .unwrap();
    let second = repo.get_state_id(&cancel).await.unwrap();
    assert_ne!(first, second);

    assert_eq!(repo.get_version_for(&cancel, "metro-zazie").await.unwrap(), first);
    assert_eq!(repo.get_version_for(&cancel, "zazie-icon").await.unwrap(), second);
}

#[tokio::test]
async fn test_overwrite_and_copy() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"v1".to_vec(), "ux"))
        .await
        .unwrap();
    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"v2".to_vec(), "ux"))
        .await
        .unwrap();
    repo.copy_blob(&cancel, "zazie-icon", "zazie-icon-copy", "ux")
        .await
        .unwrap();

    assert_eq!(repo.get_blob(&cancel, "zazie-icon-copy").await.unwrap(), b"v2");
    let metadata = repo.get_version_metadata(&cancel, "").await.unwrap();
    assert_eq!(metadata.message, "blob file version added by ux");
}

#[tokio::test]
async fn test_list_matches_added_keys() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    assert!(repo.list_blob_keys(&cancel).await.unwrap().is_empty());

    let keys: BTreeSet<String> = (0..5).map(|i| format!("blob-{i}")).collect();
    for key in &keys {
        repo.add_blob(&cancel, &BlobInfo::new(key.as_str(), random_content(64), "ux"))
            .await
            .unwrap();
    }
    assert_eq!(repo.list_blob_keys(&cancel).await.unwrap(), keys);

    repo.delete_blob(&cancel, "blob-3", "ux").await.unwrap();
    let remaining = repo.list_blob_keys(&cancel).await.unwrap();
    assert_eq!(remaining.len(), 4);
    assert!(!remaining.contains("blob-3"));
}

// =============================================================================
// Failures leave no trace
// =============================================================================

#[tokio::test]
async fn test_delete_missing_blob() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"x".to_vec(), "ux"))
        .await
        .unwrap();
    let before = repo.get_state_id(&cancel).await.unwrap();

    let err = repo.delete_blob(&cancel, "metro-zazie", "ux").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(repo.check_status(&cancel).await.unwrap());
    assert_eq!(repo.get_state_id(&cancel).await.unwrap(), before);
}

#[tokio::test]
async fn test_simulated_failure_restores_tree() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"kept".to_vec(), "ux"))
        .await
        .unwrap();
    let before = repo.get_state_id(&cancel).await.unwrap();

    repo.set_simulate_commit_failure(true);
    let err = repo
        .add_blob(&cancel, &BlobInfo::new("metro-zazie", random_content(4096), "ux"))
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
    let err = repo
        .add_blob(&cancel, &BlobInfo::new("zazie-icon", b"changed".to_vec(), "ux"))
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    repo.set_simulate_commit_failure(false);

    assert!(repo.check_status(&cancel).await.unwrap());
    assert_eq!(repo.get_state_id(&cancel).await.unwrap(), before);
    let keys = repo.list_blob_keys(&cancel).await.unwrap();
    assert_eq!(keys.into_iter().collect::<Vec<_>>(), ["zazie-icon"]);
    assert_eq!(repo.get_blob(&cancel, "zazie-icon").await.unwrap(), b"kept");
    assert!(repo.get_blob(&cancel, "metro-zazie").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_version_for_unwritten_key() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    assert_eq!(repo.get_version_for(&cancel, "never-added").await.unwrap(), "");
    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"x".to_vec(), "ux"))
        .await
        .unwrap();
    assert_eq!(repo.get_version_for(&cancel, "never-added").await.unwrap(), "");
}

#[tokio::test]
async fn test_version_for_matches_key_literally() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("metro-zazie", b"zazie".to_vec(), "ux"))
        .await
        .unwrap();
    let state = repo.get_state_id(&cancel).await.unwrap();

    assert_eq!(repo.get_version_for(&cancel, "metro-zazie").await.unwrap(), state);
    assert_eq!(repo.get_version_for(&cancel, "*").await.unwrap(), "");
    assert_eq!(repo.get_version_for(&cancel, "metro-*").await.unwrap(), "");
    assert_eq!(repo.get_version_for(&cancel, "metro-?azie").await.unwrap(), "");
}

#[tokio::test]
async fn test_keys_keep_surrounding_whitespace() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new(" spaced ", b"padded".to_vec(), "ux"))
        .await
        .unwrap();
    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"<svg/>".to_vec(), "ux"))
        .await
        .unwrap();

    let keys = repo.list_blob_keys(&cancel).await.unwrap();
    let expected: BTreeSet<String> = [" spaced ", "zazie-icon"].into_iter().map(String::from).collect();
    assert_eq!(keys, expected);
    for key in &keys {
        assert!(repo.get_blob(&cancel, key).await.is_ok(), "{key:?} not readable");
    }
    assert_eq!(repo.get_blob(&cancel, " spaced ").await.unwrap(), b"padded");
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_reset_and_delete() {
    let dir = temp_dir();
    let repo = empty_repo(&dir).await;
    let cancel = CancellationToken::new();

    repo.add_blob(&cancel, &BlobInfo::new("zazie-icon", b"x".to_vec(), "ux"))
        .await
        .unwrap();
    repo.reset_repository(&cancel).await.unwrap();
    assert!(repo.list_blob_keys(&cancel).await.unwrap().is_empty());
    assert!(repo.location_has_repo().await.unwrap());

    repo.delete_repository(&cancel).await.unwrap();
    assert!(!repo.location().exists());
    repo.delete_repository(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_handles_share_one_serializer() {
    let dir = temp_dir();
    let serializer = Arc::new(JobSerializer::new("vcblob-shared").unwrap());
    let config = config_at(&dir.path().join("blobs"));
    let first = Arc::new(LocalRepository::new(&config, Arc::clone(&serializer)).unwrap());
    let second = LocalRepository::new(&config, Arc::clone(&serializer)).unwrap();
    let cancel = CancellationToken::new();
    first.create_repository(&cancel).await.unwrap();

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&first);
            tokio::spawn(async move {
                let blob = BlobInfo::new(format!("blob-{i}"), random_content(128), "ux");
                repo.add_blob(&CancellationToken::new(), &blob).await
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(second.list_blob_keys(&cancel).await.unwrap().len(), 8);
    assert!(second.check_status(&cancel).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opened_handles_on_one_location_are_serialized() {
    let dir = temp_dir();
    let location = dir.path().join("blobs");
    let first = Arc::new(LocalRepository::open(&config_at(&location)).unwrap());
    let second = Arc::new(LocalRepository::open(&config_at(&location)).unwrap());
    assert!(Arc::ptr_eq(first.serializer(), second.serializer()));

    let cancel = CancellationToken::new();
    first.create_repository(&cancel).await.unwrap();

    let writers: Vec<_> = (0..20)
        .map(|i| {
            let repo = Arc::clone(if i % 2 == 0 { &first } else { &second });
            tokio::spawn(async move {
                let blob = BlobInfo::new(format!("blob-{i}"), random_content(256), "ux");
                repo.add_blob(&CancellationToken::new(), &blob).await
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(first.list_blob_keys(&cancel).await.unwrap().len(), 20);
    assert!(second.check_status(&cancel).await.unwrap());
}
