// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! GitLab REST request and response bodies.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Header carrying the number of requests left in the rate limit window.
pub const RATE_LIMIT_REMAINING: &str = "RateLimit-Remaining";
/// Header naming the commit that last changed a file.
pub const LAST_COMMIT_ID: &str = "X-Gitlab-Last-Commit-Id";
/// Header naming the commit a file was read at.
pub const COMMIT_ID: &str = "X-Gitlab-Commit-Id";
/// Header naming the next page of a paginated listing.
pub const NEXT_PAGE: &str = "X-Next-Page";

/// Tree listing page size.
pub const TREE_PAGE_SIZE: u32 = 100;

/// `POST /projects` body.
#[derive(Debug, Serialize)]
pub struct ProjectProperties<'a> {
    pub namespace_id: u64,
    pub path: &'a str,
}

/// `POST /projects/:id/repository/commits` body.
#[derive(Debug, Serialize)]
pub struct CommitProperties<'a> {
    pub branch: &'a str,
    pub author_name: &'a str,
    pub commit_message: &'a str,
    pub actions: Vec<CommitAction>,
}

/// What a commit action does to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Delete,
    Move,
    Update,
    Chmod,
}

/// One file change inside a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitAction {
    pub action: ActionKind,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
}

impl CommitAction {
    /// Action carrying `content`. Content of one byte or less is omitted.
    #[must_use]
    pub fn with_content(action: ActionKind, file_path: &str, content: &[u8]) -> Self {
        let (content, encoding) = if content.len() > 1 {
            (Some(STANDARD.encode(content)), Some("base64"))
        } else {
            (None, None)
        };
        Self {
            action,
            file_path: file_path.to_string(),
            content,
            encoding,
        }
    }

    /// Action that names a file only.
    #[must_use]
    pub fn without_content(action: ActionKind, file_path: &str) -> Self {
        Self {
            action,
            file_path: file_path.to_string(),
            content: None,
            encoding: None,
        }
    }
}

/// One entry of a repository tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub mode: String,
}

impl TreeItem {
    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// `GET /projects/:id/repository/files/:path` response.
#[derive(Debug, Clone, Deserialize)]
pub struct FileResponse {
    #[serde(default)]
    pub file_path: String,
    pub encoding: String,
    pub content: String,
    #[serde(default)]
    pub last_commit_id: String,
}

impl FileResponse {
    /// Decoded content.
    ///
    /// # Errors
    ///
    /// Returns the decode error for content that is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.content.as_bytes())
    }
}

/// One entry of `GET /namespaces`.
#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceInfo {
    pub id: u64,
    pub path: String,
    #[serde(default)]
    pub full_path: String,
}

impl NamespaceInfo {
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.path == path || self.full_path == path
    }
}
