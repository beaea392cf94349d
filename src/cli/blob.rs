// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Blob command arguments.
//!
//! ```text
//! add KEY [--file F] -u USER    content from F or stdin
//! copy SRC DST -u USER
//! get KEY [--output F]          content to F or stdout
//! delete KEY -u USER
//! version-for KEY
//! metadata [VERSION]            HEAD when omitted
//! ```

use clap::Args;
use std::path::PathBuf;

/// Arguments for the `add` command.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Blob key (a flat file name).
    pub key: String,

    /// Read content from this file instead of stdin.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// User recorded as the author of the change.
    #[arg(short = 'u', long = "user", env = "USER")]
    pub user: String,
}

/// Arguments for the `copy` command.
#[derive(Debug, Clone, Args)]
pub struct CopyArgs {
    /// Key to copy from.
    pub source: String,

    /// Key to copy to.
    pub destination: String,

    /// User recorded as the author of the change.
    #[arg(short = 'u', long = "user", env = "USER")]
    pub user: String,
}

/// Arguments for the `get` command.
#[derive(Debug, Clone, Args)]
pub struct GetArgs {
    /// Blob key.
    pub key: String,

    /// Write content to this file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `delete` command.
#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Blob key.
    pub key: String,

    /// User recorded as the author of the change.
    #[arg(short = 'u', long = "user", env = "USER")]
    pub user: String,
}

/// Arguments for commands taking a single key.
#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    /// Blob key.
    pub key: String,
}

/// Arguments for the `metadata` command.
#[derive(Debug, Clone, Args)]
pub struct MetadataArgs {
    /// Version token; the current version when omitted.
    pub version: Option<String>,
}
