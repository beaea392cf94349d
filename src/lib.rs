// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |            blob / config / store
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |      store::BlobStore     |
//!              '-----+---------------+-----'
//!                    |               |
//!                    v               v
//!              git::local         remote
//!          serializer + CLI    GitLab REST API
//!                    |               |
//!                    +-------+-------+
//!                            v
//!                         metadata
//!
//!   +-----------------------------------------+
//!   |  foundation   config, error, logging    |
//!   +-----------------------------------------+
//! ```

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod metadata;
pub mod remote;
pub mod store;
