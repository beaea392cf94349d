// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for vcblob.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. vcblob.toml (cwd, optional)
//! 3. --config
//! 4. VCBLOB_* env vars
//! 5. CLI overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! VCBLOB_STORE__BACKEND=remote          → store.backend = "remote"
//! VCBLOB_LOCAL__LOCATION=/srv/blobs     → local.location = "/srv/blobs"
//! VCBLOB_REMOTE__ACCESS_TOKEN=glpat-... → remote.access_token = "glpat-..."
//! ```

pub mod loader;
pub mod types;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

use loader::ConfigLoader;
use types::{BackendKind, GlobalConfig, LocalConfig, RemoteConfig, StoreConfig};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Backend selection.
    pub store: StoreConfig,
    /// Local git backend.
    pub local: LocalConfig,
    /// GitLab backend.
    pub remote: RemoteConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vcblob::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("vcblob.toml")
    ///     .with_env_prefix("VCBLOB")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML, does not match the
    /// `Config` structure, or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Check that the selected backend has what it needs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` for an absent required setting and
    /// `ConfigError::InvalidValue` for a zero pool size or attempt count.
    pub fn resolve_and_validate(&mut self) -> Result<()> {
        match self.store.backend {
            BackendKind::Local => self.validate_local()?,
            BackendKind::Remote => self.validate_remote()?,
        }
        Ok(())
    }

    fn validate_local(&mut self) -> std::result::Result<(), ConfigError> {
        let Some(location) = self.local.location.as_ref() else {
            return Err(missing("local", "location"));
        };
        if location.as_os_str().is_empty() {
            return Err(missing("local", "location"));
        }
        if location.is_relative()
            && let Ok(cwd) = std::env::current_dir()
        {
            self.local.location = Some(cwd.join(location));
        }
        Ok(())
    }

    fn validate_remote(&mut self) -> std::result::Result<(), ConfigError> {
        let remote = &mut self.remote;
        for (key, value) in [
            ("access_token", &remote.access_token),
            ("namespace_path", &remote.namespace_path),
            ("project_path", &remote.project_path),
            ("main_branch", &remote.main_branch),
            ("api_url", &remote.api_url),
        ] {
            if value.trim().is_empty() {
                return Err(missing("remote", key));
            }
        }
        if remote.pool_size == 0 {
            return Err(invalid("remote", "pool_size", "must be at least 1"));
        }
        if remote.create_max_attempts == 0 {
            return Err(invalid("remote", "create_max_attempts", "must be at least 1"));
        }
        let trimmed = remote.api_url.trim_end_matches('/').len();
        remote.api_url.truncate(trimmed);
        Ok(())
    }

    /// Format configuration options for display.
    ///
    /// The access token is shown as `[hidden]`. Output is ordered by key.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_local_options(&mut options);
        self.format_remote_options(&mut options);
        options.insert("store.backend".into(), self.store.backend.to_string());

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert("global.log_file".into(), fmt_path(self.global.log_file.as_ref()));
    }

    fn format_local_options(&self, options: &mut BTreeMap<String, String>) {
        let local = &self.local;
        options.insert("local.location".into(), fmt_path(local.location.as_ref()));
        options.insert("local.git_program".into(), fmt_path(local.git_program.as_ref()));
        options.insert("local.committer_name".into(), local.committer_name.clone());
        options.insert("local.committer_email".into(), local.committer_email.clone());
        options.insert(
            "local.metadata_format".into(),
            format!("{:?}", local.metadata_format).to_lowercase(),
        );
        options.insert(
            "local.simulate_commit_failure".into(),
            local.simulate_commit_failure.to_string(),
        );
    }

    fn format_remote_options(&self, options: &mut BTreeMap<String, String>) {
        let remote = &self.remote;
        options.insert("remote.api_url".into(), remote.api_url.clone());
        if !remote.access_token.is_empty() {
            options.insert("remote.access_token".into(), "[hidden]".into());
        }
        options.insert("remote.namespace_path".into(), remote.namespace_path.clone());
        options.insert("remote.project_path".into(), remote.project_path.clone());
        options.insert("remote.main_branch".into(), remote.main_branch.clone());
        options.insert("remote.pool_size".into(), remote.pool_size.to_string());
        options.insert(
            "remote.request_timeout_secs".into(),
            remote.request_timeout_secs.to_string(),
        );
        options.insert(
            "remote.create_max_attempts".into(),
            remote.create_max_attempts.to_string(),
        );
        options.insert(
            "remote.create_backoff_ms".into(),
            remote.create_backoff_ms.to_string(),
        );
        options.insert(
            "remote.rate_limit_low_water".into(),
            remote.rate_limit_low_water.to_string(),
        );
        options.insert(
            "remote.simulate_commit_failure".into(),
            remote.simulate_commit_failure.to_string(),
        );
    }
}

fn fmt_path(path: Option<&PathBuf>) -> String {
    path.map_or_else(String::new, |p| p.display().to_string())
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        message: message.to_string(),
    }
}
