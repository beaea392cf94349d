// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Global CLI options available for all commands.
//!
//! # Option Precedence
//!
//! ```text
//! --config FILE     ← config file loaded after ./vcblob.toml
//! --backend KIND    ← store.backend override
//! --location DIR    ← local.location override
//! --log-level N     ← Console verbosity (0-6)
//! --file-log-level  ← File verbosity (falls back to --log-level)
//! --log-file FILE   ← global.log_file override
//! --set KEY=VAL     ← Direct config override
//!
//! Precedence: CLI flags > --set > VCBLOB_* > --config > vcblob.toml > defaults
//! ```

use clap::Args;
use std::path::PathBuf;

use crate::config::types::BackendKind;

/// Global options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Path to a TOML configuration file.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use (local or remote).
    #[arg(short = 'b', long = "backend", value_name = "KIND", global = true)]
    pub backend: Option<BackendKind>,

    /// Directory of the local repository.
    #[arg(long = "location", value_name = "DIR", global = true)]
    pub location: Option<PathBuf>,

    /// Console log level (0=silent, 1=errors, 2=warnings, 3=info, 4=debug, 5=trace, 6=dump).
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true,
        value_parser = clap::value_parser!(u8).range(0..=6))]
    pub log_level: Option<u8>,

    /// File log level, overrides --log-level for the log file.
    #[arg(long = "file-log-level", value_name = "LEVEL", global = true,
        value_parser = clap::value_parser!(u8).range(0..=6))]
    pub file_log_level: Option<u8>,

    /// Path to log file.
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Sets an option, such as 'remote.main_branch=develop'.
    /// Can be specified multiple times.
    #[arg(short = 's', long = "set", value_name = "OPTION", global = true,
        action = clap::ArgAction::Append)]
    pub options: Vec<String>,
}

impl GlobalOptions {
    /// Converts command-line options to `(key, value)` configuration overrides.
    ///
    /// `--set` entries without `=` are skipped.
    #[must_use]
    pub fn to_config_overrides(&self) -> Vec<(String, String)> {
        let mut overrides: Vec<(String, String)> = self
            .options
            .iter()
            .filter_map(|option| option.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        if let Some(backend) = self.backend {
            overrides.push(("store.backend".to_string(), backend.to_string()));
        }

        if let Some(ref location) = self.location {
            overrides.push(("local.location".to_string(), location.display().to_string()));
        }

        if let Some(level) = self.log_level {
            overrides.push(("global.output_log_level".to_string(), level.to_string()));
        }

        if let Some(level) = self.file_log_level.or(self.log_level) {
            overrides.push(("global.file_log_level".to_string(), level.to_string()));
        }

        if let Some(ref path) = self.log_file {
            overrides.push(("global.log_file".to_string(), path.display().to_string()));
        }

        overrides
    }
}
