// vcblob: versioned blob store over git and GitLab
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Config, ConfigLoader};
use crate::config::types::{BackendKind, RemoteConfig};
use crate::logging::LogLevel;
use crate::metadata::MetadataFormat;
use std::path::PathBuf;

const LOCAL_MINIMAL: &str = r#"
[local]
location = "/srv/blobs"
"#;

const REMOTE_MINIMAL: &str = r#"
[store]
backend = "remote"

[remote]
access_token = "glpat-secret"
namespace_path = "acme"
project_path = "blobs"
"#;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.store.backend, BackendKind::Local);
    assert_eq!(config.global.output_log_level, LogLevel::INFO);
    assert_eq!(config.local.metadata_format, MetadataFormat::Structured);
    assert_eq!(config.remote.api_url, "https://gitlab.com/api/v4");
    assert_eq!(config.remote.main_branch, "main");
    assert_eq!(config.remote.pool_size, 20);
    assert_eq!(config.remote.create_max_attempts, 20);
    assert_eq!(config.remote.create_backoff_ms, 1000);
    assert_eq!(config.remote.rate_limit_low_water, 5);
}

#[test]
fn test_backend_kind_parse() {
    assert_eq!("Remote".parse::<BackendKind>().unwrap(), BackendKind::Remote);
    assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
    let err = "s3".parse::<BackendKind>().unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'backend' in section '[store]': expected 'local' or 'remote', got 's3'"
    );
}

#[test]
fn test_parse_local_minimal() {
    let config = Config::parse(LOCAL_MINIMAL).unwrap();
    assert_eq!(config.local.location, Some(PathBuf::from("/srv/blobs")));
    assert!(!config.local.simulate_commit_failure);
}

#[test]
fn test_local_requires_location() {
    let err = Config::parse("").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"missing required config key 'location' in section '[local]'"
    );
}

#[test]
fn test_relative_location_is_made_absolute() {
    let config = Config::parse("[local]\nlocation = \"blobs\"").unwrap();
    let location = config.local.location.unwrap();
    assert!(location.is_absolute());
    assert!(location.ends_with("blobs"));
}

#[test]
fn test_parse_remote_minimal() {
    let config = Config::parse(REMOTE_MINIMAL).unwrap();
    assert_eq!(config.store.backend, BackendKind::Remote);
    assert_eq!(config.remote.project_full_path(), "acme/blobs");
    assert_eq!(config.remote.request_timeout().as_secs(), 5);
}

#[test]
fn test_remote_requires_token() {
    let toml = r#"
[store]
backend = "remote"

[remote]
namespace_path = "acme"
project_path = "blobs"
"#;
    let err = Config::parse(toml).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"missing required config key 'access_token' in section '[remote]'"
    );
}

#[test]
fn test_remote_rejects_zero_pool() {
    let toml = format!("{REMOTE_MINIMAL}pool_size = 0\n");
    let err = Config::parse(&toml).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'pool_size' in section '[remote]': must be at least 1"
    );
}

#[test]
fn test_api_url_trailing_slash_trimmed() {
    let toml = format!("{REMOTE_MINIMAL}api_url = \"http://127.0.0.1:8080/api/v4/\"\n");
    let config = Config::parse(&toml).unwrap();
    assert_eq!(config.remote.api_url, "http://127.0.0.1:8080/api/v4");
}

#[test]
fn test_metadata_format_parse() {
    let toml = format!("{LOCAL_MINIMAL}metadata_format = \"fuller\"\n");
    let config = Config::parse(&toml).unwrap();
    assert_eq!(config.local.metadata_format, MetadataFormat::Fuller);
}

#[test]
fn test_config_loader_optional_only_tracks_existing() {
    let loader = ConfigLoader::new().add_toml_file_optional("/nonexistent/path.toml");
    assert!(loader.loaded_files().is_empty());
}

#[test]
fn test_config_loader_tracks_required_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vcblob.toml");
    std::fs::write(&path, LOCAL_MINIMAL).unwrap();

    let loader = ConfigLoader::new().add_toml_file(&path);
    assert_eq!(loader.loaded_files(), [path.clone()]);
    let config = loader.build().unwrap();
    assert_eq!(config.local.location, Some(PathBuf::from("/srv/blobs")));
}

#[test]
fn test_config_loader_override_wins() {
    let config = ConfigLoader::new()
        .add_toml_str(LOCAL_MINIMAL)
        .set("local.location", "/override")
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(config.local.location, Some(PathBuf::from("/override")));
}

#[test]
fn test_format_options_hides_token() {
    let config = Config::parse(REMOTE_MINIMAL).unwrap();
    let formatted = config.format_options().join("\n");

    assert!(formatted.contains("remote.access_token") && formatted.contains("[hidden]"));
    assert!(!formatted.contains("glpat-secret"));
}

#[test]
fn test_format_options_deterministic() {
    let config = Config::parse(REMOTE_MINIMAL).unwrap();
    let first = config.format_options();
    let second = config.format_options();
    assert_eq!(first, second);

    let keys: Vec<_> = first
        .iter()
        .map(|line| line.split(" = ").next().unwrap().trim().to_string())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_remote_debug_hides_token() {
    let remote = RemoteConfig {
        access_token: "glpat-secret".to_string(),
        ..RemoteConfig::default()
    };
    let debug = format!("{remote:?}");
    assert!(debug.contains("[hidden]"));
    assert!(!debug.contains("glpat-secret"));
}

#[test]
fn test_serialized_config_omits_token() {
    let config = Config::parse(REMOTE_MINIMAL).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("glpat-secret"));
}

#[test]
fn test_deny_unknown_fields_top_level() {
    let toml = format!("{LOCAL_MINIMAL}\n[unknown_section]\nfoo = \"bar\"\n");
    let err = Config::parse(&toml).unwrap_err();
    assert!(err.to_string().contains("unknown_section"), "{err}");
}

#[test]
fn test_deny_unknown_fields_in_section() {
    let toml = format!("{LOCAL_MINIMAL}dry = true\n");
    assert!(Config::parse(&toml).is_err());
}
