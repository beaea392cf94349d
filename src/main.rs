// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> Backend::open --> Command Dispatch
//!   Create | Reset | Destroy | Add | Copy | Get | Delete | List | ...
//! ```

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;

use vcblob::cli::global::GlobalOptions;
use vcblob::cli::{self, Command};
use vcblob::cmd::blob::{
    run_add_command, run_copy_command, run_create_command, run_delete_command, run_destroy_command,
    run_get_command, run_list_command, run_metadata_command, run_reset_command, run_state_id_command,
    run_status_command, run_version_for_command,
};
use vcblob::cmd::config::run_options_command;
use vcblob::cmd::store::Backend;
use vcblob::config::Config;
use vcblob::config::loader::ConfigLoader;
use vcblob::error::Result;
use vcblob::logging::{LogConfig, init_logging};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    let Some(command) = cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        return ExitCode::FAILURE;
    };

    if matches!(command, Command::Version) {
        handle_version_command();
        return ExitCode::SUCCESS;
    }

    let (config, loaded_files) = match load_config(&cli.global) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&LogConfig::from(&config.global)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = if matches!(command, Command::Options) {
        run_options_command(&config, &loaded_files, &mut std::io::stdout())
    } else {
        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());
        dispatch_command(&command, &config, &cancel).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling...");
            cancel.cancel();
        }
    });
}

async fn dispatch_command(command: &Command, config: &Config, cancel: &CancellationToken) -> Result<()> {
    let store = Backend::open(config, cancel).await?;
    let mut out = std::io::stdout();

    match command {
        Command::Create => run_create_command(&store, cancel).await,
        Command::Reset => run_reset_command(&store, cancel).await,
        Command::Destroy => run_destroy_command(&store, cancel).await,
        Command::Add(args) => run_add_command(&store, args, cancel).await,
        Command::Copy(args) => run_copy_command(&store, args, cancel).await,
        Command::Get(args) => run_get_command(&store, args, cancel, &mut out).await,
        Command::Delete(args) => run_delete_command(&store, args, cancel).await,
        Command::List => run_list_command(&store, cancel, &mut out).await,
        Command::StateId => run_state_id_command(&store, cancel, &mut out).await,
        Command::VersionFor(args) => run_version_for_command(&store, args, cancel, &mut out).await,
        Command::Metadata(args) => run_metadata_command(&store, args, cancel, &mut out).await,
        Command::Status => run_status_command(&store, cancel, &mut out).await,
        Command::Version | Command::Options => Ok(()),
    }
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn load_config(global: &GlobalOptions) -> Result<(Config, Vec<std::path::PathBuf>)> {
    let mut loader = ConfigLoader::standard(global.config.as_deref());
    for (key, value) in global.to_config_overrides() {
        loader = loader.set(&key, value)?;
    }
    let loaded_files = loader.loaded_files().to_vec();
    Ok((loader.build()?, loaded_files))
}
