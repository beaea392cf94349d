// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands for vcblob.

use std::io::Write;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

/// Display loaded configuration files and current configuration options.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn run_options_command<W: Write>(config: &Config, loaded_files: &[PathBuf], out: &mut W) -> Result<()> {
    if loaded_files.is_empty() {
        writeln!(out, "# no configuration files loaded")?;
    } else {
        for file in loaded_files {
            writeln!(out, "# {}", file.display())?;
        }
    }
    for line in config.format_options() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
