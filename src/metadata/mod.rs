// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commit provenance model and the parsers that normalize into it.
//!
//! ```text
//!  git show --format=<STRUCTURED_FORMAT>  --> parse_structured ---+
//!  git show --format=fuller (fallback)    --> parse_fuller -------+--> CommitMetadata
//!  GET /repository/commits/:sha (JSON)    --> CommitResponse -----+
//! ```
//!
//! `parse_fuller` relies on `--date=format:%Y-%m-%dT%H:%M:%S%z`, whose offset
//! is always exactly four digits (`+0200`). The colon is reinserted before
//! RFC 3339 parsing; any other offset shape is rejected.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// `git show` format producing NUL-separated fields with strict ISO dates.
pub const STRUCTURED_FORMAT: &str = "--format=%an <%ae>%x00%aI%x00%cn <%ce>%x00%cI%x00%B";

/// Arguments for the textual fallback query.
pub const FULLER_ARGS: [&str; 4] = [
    "show",
    "--quiet",
    "--format=fuller",
    "--date=format:%Y-%m-%dT%H:%M:%S%z",
];

/// Canonical provenance record of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMetadata {
    /// `"Name <email>"` of the author.
    pub author: String,
    pub author_date: DateTime<FixedOffset>,
    /// `"Name <email>"` of the committer.
    pub commit: String,
    pub commit_date: DateTime<FixedOffset>,
    pub message: String,
}

/// Which `git show` output the local backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataFormat {
    /// NUL-separated fields, strict ISO 8601 dates.
    #[default]
    Structured,
    /// `--format=fuller` text with reconstructed offsets.
    Fuller,
}

impl MetadataFormat {
    /// `git show` arguments for this format.
    #[must_use]
    pub fn show_args(self) -> Vec<&'static str> {
        match self {
            Self::Structured => vec!["show", "--quiet", STRUCTURED_FORMAT],
            Self::Fuller => FULLER_ARGS.to_vec(),
        }
    }

    /// Parse the output of [`Self::show_args`].
    ///
    /// # Errors
    ///
    /// Returns a `MetadataError` if a field is missing or a date is invalid.
    pub fn parse(self, output: &str) -> Result<CommitMetadata, MetadataError> {
        match self {
            Self::Structured => parse_structured(output),
            Self::Fuller => parse_fuller(output),
        }
    }
}

fn parse_rfc3339(value: &str) -> Result<DateTime<FixedOffset>, MetadataError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| MetadataError::InvalidTimestamp {
        value: value.to_string(),
        source,
    })
}

/// Parse the NUL-separated output of [`STRUCTURED_FORMAT`].
///
/// # Errors
///
/// Returns a `MetadataError` if fewer than five fields are present or a date
/// is not RFC 3339.
pub fn parse_structured(output: &str) -> Result<CommitMetadata, MetadataError> {
    let mut fields = output.splitn(5, '\0');
    let mut next = |name: &'static str| fields.next().ok_or(MetadataError::MissingField(name));

    let author = next("author")?.trim().to_string();
    let author_date = parse_rfc3339(next("author_date")?.trim())?;
    let commit = next("commit")?.trim().to_string();
    let commit_date = parse_rfc3339(next("commit_date")?.trim())?;
    let message = next("message")?.trim().to_string();

    Ok(CommitMetadata {
        author,
        author_date,
        commit,
        commit_date,
        message,
    })
}

struct FullerPatterns {
    author: Regex,
    author_date: Regex,
    commit: Regex,
    commit_date: Regex,
}

fn fuller_patterns() -> &'static FullerPatterns {
    static PATTERNS: OnceLock<FullerPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Literal patterns, verified by the unit tests.
        let compile = |p: &str| Regex::new(p).unwrap_or_else(|_| unreachable!("static regex: {p}"));
        FullerPatterns {
            author: compile(r"^Author:[ \t]+(.+)$"),
            author_date: compile(r"^AuthorDate:[ \t]+(.+)([+-][0-9]{2})([0-9]{2})$"),
            commit: compile(r"^Commit:[ \t]+(.+)$"),
            commit_date: compile(r"^CommitDate:[ \t]+(.+)([+-][0-9]{2})([0-9]{2})$"),
        }
    })
}

/// Rebuild `2022-10-09T13:42:12+0200` as `2022-10-09T13:42:12+02:00` and parse it.
fn parse_fuller_date(
    pattern: &Regex,
    line: &str,
) -> Result<Option<DateTime<FixedOffset>>, MetadataError> {
    let Some(caps) = pattern.captures(line) else {
        return Ok(None);
    };
    let rfc3339 = format!("{}{}:{}", &caps[1], &caps[2], &caps[3]);
    parse_rfc3339(&rfc3339).map(Some)
}

/// Parse `git show --quiet --format=fuller --date=format:%Y-%m-%dT%H:%M:%S%z`.
///
/// Fields may appear in any order; message lines are the ones indented by
/// four spaces.
///
/// # Errors
///
/// Returns a `MetadataError` if a date cannot be parsed or one of the four
/// header fields is absent.
pub fn parse_fuller(output: &str) -> Result<CommitMetadata, MetadataError> {
    let patterns = fuller_patterns();

    let mut author = None;
    let mut author_date = None;
    let mut commit = None;
    let mut commit_date = None;
    let mut message = Vec::new();

    for line in output.lines() {
        if let Some(caps) = patterns.author.captures(line) {
            author = Some(caps[1].to_string());
        } else if let Some(caps) = patterns.commit.captures(line) {
            commit = Some(caps[1].to_string());
        } else if let Some(date) = parse_fuller_date(&patterns.author_date, line)? {
            author_date = Some(date);
        } else if let Some(date) = parse_fuller_date(&patterns.commit_date, line)? {
            commit_date = Some(date);
        } else if line.starts_with("    ") {
            message.push(line.trim_matches([' ', '\t']));
        }
    }

    Ok(CommitMetadata {
        author: author.ok_or(MetadataError::MissingField("Author"))?,
        author_date: author_date.ok_or(MetadataError::MissingField("AuthorDate"))?,
        commit: commit.ok_or(MetadataError::MissingField("Commit"))?,
        commit_date: commit_date.ok_or(MetadataError::MissingField("CommitDate"))?,
        message: message.join("\n"),
    })
}

/// One commit as returned by the GitLab commits API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitResponse {
    pub id: String,
    #[serde(default)]
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committed_date: String,
}

impl TryFrom<CommitResponse> for CommitMetadata {
    type Error = MetadataError;

    fn try_from(response: CommitResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            author: format!("{} <{}>", response.author_name, response.author_email),
            author_date: parse_rfc3339(&response.authored_date)?,
            commit: format!("{} <{}>", response.committer_name, response.committer_email),
            commit_date: parse_rfc3339(&response.committed_date)?,
            message: response.message.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests;
