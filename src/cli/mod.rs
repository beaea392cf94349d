// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for vcblob using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! vcblob [global options] <command>
//! create | reset | destroy             repository lifecycle
//! add | copy | get | delete | list     blobs
//! state-id | version-for | metadata    versions
//! status | options | version
//! ```

pub mod blob;
pub mod global;


use crate::cli::blob::{AddArgs, CopyArgs, DeleteArgs, GetArgs, KeyArgs, MetadataArgs};
use crate::cli::global::GlobalOptions;
use clap::{Parser, Subcommand};

/// Versioned blob store over a local git repository or a GitLab project.
#[derive(Debug, Parser)]
#[command(
    name = "vcblob",
    author,
    version,
    about = "Versioned blob store",
    long_about = "vcblob Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Stores opaque blobs by key. Every change is a commit, in a\n\
                  local git repository or in a GitLab project.",
    after_help = "CONFIGURATION:\n\n\
                  vcblob reads ./vcblob.toml if present, then the file given with\n\
                  --config, then VCBLOB_<SECTION>__<KEY> environment variables,\n\
                  then --set and the other global flags."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    Version,

    /// Lists all options and their values.
    Options,

    /// Creates the repository unless it exists.
    Create,

    /// Deletes and recreates the repository.
    Reset,

    /// Deletes the repository.
    Destroy,

    /// Stores a blob.
    Add(AddArgs),

    /// Copies a blob to another key.
    Copy(CopyArgs),

    /// Prints a blob.
    Get(GetArgs),

    /// Deletes a blob.
    Delete(DeleteArgs),

    /// Lists all blob keys.
    List,

    /// Prints the current version.
    #[command(name = "state-id")]
    StateId,

    /// Prints the version that last changed a blob.
    #[command(name = "version-for")]
    VersionFor(KeyArgs),

    /// Prints the metadata of a version as JSON.
    Metadata(MetadataArgs),

    /// Checks that the repository has no uncommitted changes.
    Status,
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
