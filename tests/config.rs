use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use kira_cyc::config::{Config, ConfigLoader};
use kira_cyc::error::CycError;
use kira_cyc::identity::Detail;

#[test]
fn resolve_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-cyc.json");
    fs::write(
        &path,
        r#"{
            "base_url": "http://localhost:1555/",
            "timeout_secs": 5,
            "max_retries": 0,
            "default_detail": "full"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    // BIOCYC_BASE_URL may override base_url in the caller's environment
    if std::env::var("BIOCYC_BASE_URL").is_err() {
        assert_eq!(resolved.base_url, "http://localhost:1555/");
    }
    assert_eq!(resolved.atom_mapping_url, "https://biocyc.org");
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(resolved.max_retries, 0);
    assert_eq!(resolved.retry_delay, Duration::from_millis(200));
    assert_eq!(resolved.default_detail, Some(Detail::Full));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(Some(path.to_str().unwrap())),
        Err(CycError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kira-cyc.json");
    fs::write(&path, r#"{ "default_detail": "everything" }"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(Some(path.to_str().unwrap())),
        Err(CycError::ConfigParse(_))
    );
}

#[test]
fn empty_config_uses_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    let resolved = ConfigLoader::resolve_config(config);
    assert_eq!(resolved.base_url, "https://websvc.biocyc.org");
    assert_eq!(resolved.timeout, Duration::from_secs(60));
    assert_eq!(resolved.max_retries, 3);
}
