// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration types for vcblob.
//!
//! # Config Structure
//!
//! ```text
//! Config: GlobalConfig, StoreConfig, LocalConfig, RemoteConfig
//! StoreConfig.backend: local (default) | remote
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::LogLevel;
use crate::metadata::MetadataFormat;

/// Which backend a `Config` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidValue {
                section: "store".to_string(),
                key: "backend".to_string(),
                message: format!("expected 'local' or 'remote', got '{s}'"),
            }),
        }
    }
}

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for stdout output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file; no file layer when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::TRACE,
            log_file: None,
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: BackendKind,
}

/// Local git backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Directory holding the repository. Required for the local backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
    /// Git executable; looked up in PATH when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_program: Option<PathBuf>,
    /// Committer identity recorded on every commit.
    pub committer_name: String,
    pub committer_email: String,
    /// `git show` output used for commit metadata.
    pub metadata_format: MetadataFormat,
    /// Replace the commit step with an invalid git verb.
    pub simulate_commit_failure: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            location: None,
            git_program: None,
            committer_name: "vcblob".to_string(),
            committer_email: "vcblob@localhost".to_string(),
            metadata_format: MetadataFormat::default(),
            simulate_commit_failure: false,
        }
    }
}

/// GitLab backend settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// API base URL, up to and including the version segment.
    pub api_url: String,
    /// Personal access token sent as `PRIVATE-TOKEN`.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Namespace that owns the project.
    pub namespace_path: String,
    /// Project path inside the namespace.
    pub project_path: String,
    /// Branch every version lives on.
    pub main_branch: String,
    /// Number of pooled HTTP clients.
    pub pool_size: usize,
    pub request_timeout_secs: u64,
    /// Attempts for project creation while the provider reports a conflict.
    pub create_max_attempts: u32,
    pub create_backoff_ms: u64,
    /// Remaining-request count below which a warning is logged.
    pub rate_limit_low_water: i64,
    /// Make every commit request fail locally.
    pub simulate_commit_failure: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://gitlab.com/api/v4".to_string(),
            access_token: String::new(),
            namespace_path: String::new(),
            project_path: String::new(),
            main_branch: "main".to_string(),
            pool_size: 20,
            request_timeout_secs: 5,
            create_max_attempts: 20,
            create_backoff_ms: 1000,
            rate_limit_low_water: 5,
            simulate_commit_failure: false,
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() { "" } else { "[hidden]" };
        f.debug_struct("RemoteConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &token)
            .field("namespace_path", &self.namespace_path)
            .field("project_path", &self.project_path)
            .field("main_branch", &self.main_branch)
            .field("pool_size", &self.pool_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("create_max_attempts", &self.create_max_attempts)
            .field("create_backoff_ms", &self.create_backoff_ms)
            .field("rate_limit_low_water", &self.rate_limit_low_water)
            .field("simulate_commit_failure", &self.simulate_commit_failure)
            .finish()
    }
}

impl RemoteConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn create_backoff(&self) -> Duration {
        Duration::from_millis(self.create_backoff_ms)
    }

    /// `namespace/project`, the path GitLab identifies the project by.
    #[must_use]
    pub fn project_full_path(&self) -> String {
        format!("{}/{}", self.namespace_path, self.project_path)
    }
}
