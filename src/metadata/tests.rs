// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{CommitMetadata, CommitResponse, MetadataFormat, parse_fuller, parse_structured};
use crate::error::MetadataError;
use chrono::DateTime;

const FULLER_OUTPUT: &str = "commit 95fb34a325e697bafffb785ac65ecca986ca06a6
Author:     Kovács, Péter <peter.dunay.kovacs@gmail.com>
AuthorDate: 2022-10-09T13:42:12+0200
Commit:     Péter Kovács <peter.dunay.kovacs@gmail.com>
CommitDate: 2022-10-31T15:30:17+0100
\t
    [DEV] distributed git access";

fn expected() -> CommitMetadata {
    CommitMetadata {
        author: "Kovács, Péter <peter.dunay.kovacs@gmail.com>".to_string(),
        author_date: DateTime::parse_from_rfc3339("2022-10-09T13:42:12+02:00").unwrap(),
        commit: "Péter Kovács <peter.dunay.kovacs@gmail.com>".to_string(),
        commit_date: DateTime::parse_from_rfc3339("2022-10-31T15:30:17+01:00").unwrap(),
        message: "[DEV] distributed git access".to_string(),
    }
}

#[test]
fn test_parse_fuller() {
    assert_eq!(parse_fuller(FULLER_OUTPUT).unwrap(), expected());
}

#[test]
fn test_parse_fuller_negative_offset_and_multiline_message() {
    let output = "Author:     ux <ux>
AuthorDate: 2024-01-02T03:04:05-0530
Commit:     vcblob <vcblob@localhost>
CommitDate: 2024-01-02T03:04:06-0530

    blob file version added by ux

    second paragraph";

    let meta = parse_fuller(output).unwrap();
    assert_eq!(meta.author, "ux <ux>");
    assert_eq!(meta.author_date.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
    assert_eq!(
        meta.message,
        "blob file version added by ux\n\nsecond paragraph"
    );
}

#[test]
fn test_parse_fuller_missing_field() {
    let output = "Author:     ux <ux>\nAuthorDate: 2024-01-02T03:04:05+0000";
    let err = parse_fuller(output).unwrap_err();
    assert!(matches!(err, MetadataError::MissingField("Commit")));
}

#[test]
fn test_parse_fuller_rejects_invalid_date() {
    let output = "AuthorDate: 2024-13-40T03:04:05+0000";
    let err = parse_fuller(output).unwrap_err();
    assert!(matches!(err, MetadataError::InvalidTimestamp { .. }));
}

#[test]
fn test_parse_structured() {
    let output = "Kovács, Péter <peter.dunay.kovacs@gmail.com>\u{0}2022-10-09T13:42:12+02:00\u{0}\
                  Péter Kovács <peter.dunay.kovacs@gmail.com>\u{0}2022-10-31T15:30:17+01:00\u{0}\
                  [DEV] distributed git access\n";
    assert_eq!(parse_structured(output).unwrap(), expected());
}

#[test]
fn test_parse_structured_keeps_nul_free_message_intact() {
    let output = "a <a>\u{0}2024-01-01T00:00:00Z\u{0}b <b>\u{0}2024-01-01T00:00:01Z\u{0}line one\nline two";
    let meta = parse_structured(output).unwrap();
    assert_eq!(meta.message, "line one\nline two");
    assert_eq!(meta.commit, "b <b>");
}

#[test]
fn test_parse_structured_truncated() {
    let err = parse_structured("a <a>\u{0}2024-01-01T00:00:00Z").unwrap_err();
    assert!(matches!(err, MetadataError::MissingField("commit")));
}

#[test]
fn test_commit_response_conversion() {
    let response: CommitResponse = serde_json::from_str(
        r#"{
            "id": "ed899a2f4b50b4370feeea94676502b42383c746",
            "short_id": "ed899a2f4b5",
            "message": "[DEV] distributed git access\n",
            "author_name": "Kovács, Péter",
            "author_email": "peter.dunay.kovacs@gmail.com",
            "authored_date": "2022-10-09T13:42:12+02:00",
            "committer_name": "Péter Kovács",
            "committer_email": "peter.dunay.kovacs@gmail.com",
            "committed_date": "2022-10-31T15:30:17.000+01:00"
        }"#,
    )
    .unwrap();

    let meta = CommitMetadata::try_from(response).unwrap();
    assert_eq!(meta, expected());
}

#[test]
fn test_local_and_remote_parsers_agree() {
    let response = CommitResponse {
        id: "x".to_string(),
        message: "[DEV] distributed git access".to_string(),
        author_name: "Kovács, Péter".to_string(),
        author_email: "peter.dunay.kovacs@gmail.com".to_string(),
        authored_date: "2022-10-09T13:42:12+02:00".to_string(),
        committer_name: "Péter Kovács".to_string(),
        committer_email: "peter.dunay.kovacs@gmail.com".to_string(),
        committed_date: "2022-10-31T15:30:17+01:00".to_string(),
    };
    let remote = CommitMetadata::try_from(response).unwrap();
    let local = MetadataFormat::Fuller.parse(FULLER_OUTPUT).unwrap();
    assert_eq!(remote, local);
}

#[test]
fn test_show_args() {
    assert_eq!(MetadataFormat::Fuller.show_args()[2], "--format=fuller");
    assert!(MetadataFormat::Structured.show_args()[2].contains("%x00"));
}
