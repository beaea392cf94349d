// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local git backend.
//!
//! ```text
//!            LocalRepository (local/)
//!            |        |         |
//!            v        v         v
//!   JobSerializer  GitCommand  query
//!   (one worker,   (git CLI,   (gix, read-only
//!    FIFO jobs)     writes)     status)
//! ```
//!
//! **`GitCommand`**: every mutation and most queries, sync inside jobs and
//! async (cancellable) outside them.
//! **`query`**: pure Rust, no subprocess.

pub mod cmd;
pub mod local;
pub mod query;
pub mod serializer;
