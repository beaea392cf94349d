// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Classification of GitLab rejections and the creation retry budget.

use std::time::Duration;

use crate::config::types::RemoteConfig;

const STILL_BEING_DELETED: &str = "The project is still being deleted. Please try again later.";
const ALREADY_TAKEN: &str = "has already been taken";
const DOES_NOT_EXIST: &str = "doesn't exist";

/// A project creation conflict that clears up on its own or after cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationConflict {
    /// A previous project with the same path is still being removed.
    StillBeingDeleted,
    /// A project with the same path exists; it is deleted before retrying.
    PathTaken,
}

/// Recognize a retryable conflict in a project creation response body.
#[must_use]
pub fn classify_creation_conflict(body: &str) -> Option<CreationConflict> {
    if body.contains(STILL_BEING_DELETED) {
        Some(CreationConflict::StillBeingDeleted)
    } else if body.contains(ALREADY_TAKEN) {
        Some(CreationConflict::PathTaken)
    } else {
        None
    }
}

/// True if a rejected commit names a file that is not in the repository.
#[must_use]
pub fn is_missing_file_rejection(body: &str) -> bool {
    body.contains(DOES_NOT_EXIST)
}

/// Fixed-backoff budget for project creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Duration::from_secs(1),
        }
    }
}

impl From<&RemoteConfig> for RetryPolicy {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            max_attempts: config.create_max_attempts,
            backoff: config.create_backoff(),
        }
    }
}

impl RetryPolicy {
    /// True once `attempt` (1-based) conflicting responses have been seen.
    #[must_use]
    pub const fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::{CreationConflict, RetryPolicy, classify_creation_conflict, is_missing_file_rejection};
    use crate::config::types::RemoteConfig;
    use std::time::Duration;

    #[test]
    fn test_classify_creation_conflict() {
        let deleting = r#"{"message":"The project is still being deleted. Please try again later."}"#;
        let taken = r#"{"message":{"path":["has already been taken"],"name":["has already been taken"]}}"#;
        let other = r#"{"message":{"path":["can contain only letters"]}}"#;

        assert_eq!(
            classify_creation_conflict(deleting),
            Some(CreationConflict::StillBeingDeleted)
        );
        assert_eq!(classify_creation_conflict(taken), Some(CreationConflict::PathTaken));
        assert_eq!(classify_creation_conflict(other), None);
    }

    #[test]
    fn test_missing_file_rejection() {
        assert!(is_missing_file_rejection(
            r#"{"message":"A file with this name doesn't exist"}"#
        ));
        assert!(!is_missing_file_rejection(
            r#"{"message":"A file with this name already exists"}"#
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let config = RemoteConfig {
            create_max_attempts: 3,
            create_backoff_ms: 10,
            ..RemoteConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.backoff, Duration::from_millis(10));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        assert_eq!(RetryPolicy::default().max_attempts, 20);
    }
}
