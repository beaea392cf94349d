// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{BlobInfo, validate_key};
use crate::error::BlobError;

#[test]
fn test_validate_key_accepts_flat_names() {
    for key in ["metro-zazie", "zazie-icon", "icon.svg", ".hidden", "a b"] {
        assert!(validate_key(key).is_ok(), "{key} should be valid");
    }
}

#[test]
fn test_validate_key_rejects_paths() {
    for key in ["", ".", "..", "dir/file", "/abs", "dir\\file", "nul\0byte"] {
        match validate_key(key) {
            Err(BlobError::InvalidKey { key: rejected, .. }) => assert_eq!(rejected, key),
            other => panic!("expected InvalidKey for {key:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_forward_slash_reason() {
    let err = validate_key("a/b").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid blob key 'a/b': invalid character in key: forward slash ('/')"
    );
}

#[test]
fn test_blob_info_debug_omits_content() {
    let blob = BlobInfo::new("metro-zazie", vec![0u8; 4096], "ux");
    let debug = format!("{blob:?}");
    assert!(debug.contains("content_len: 4096"));
    assert!(debug.contains("\"ux\""));
}
