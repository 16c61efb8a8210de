use std::io::Write;

use pretty_assertions::assert_eq;
use repolink_client::{ClientError, RepositoryConfig, init_logging};
use repolink_query::MetadataFormat;

#[test]
fn loads_full_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
url = "https://repo.example.com"
metadata = "minimal"
auto_filters = false
lifespan_filter = true
log_filter = "repolink_model=trace,info"
"#
    )
    .unwrap();

    let config = RepositoryConfig::load(file.path()).unwrap();
    assert_eq!(config.url, "https://repo.example.com");
    assert_eq!(config.metadata, MetadataFormat::Minimal);
    assert_eq!(config.auto_filters, Some(false));
    assert_eq!(config.lifespan_filter, Some(true));
    assert_eq!(config.log_filter, "repolink_model=trace,info");
}

#[test]
fn minimal_config_uses_defaults() {
    let config = RepositoryConfig::from_toml_str(r#"url = "http://localhost:8080""#).unwrap();
    assert_eq!(config, RepositoryConfig::new("http://localhost:8080"));
    assert_eq!(config.log_filter, "info");
}

#[test]
fn missing_url_is_a_toml_error() {
    let err = RepositoryConfig::from_toml_str("metadata = \"full\"").unwrap_err();
    assert!(matches!(err, ClientError::TomlDeserialize(_)));
}

#[test]
fn invalid_url_is_a_config_error() {
    let err = RepositoryConfig::from_toml_str(r#"url = "repo.example.com""#).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RepositoryConfig::load(dir.path().join("repolink.toml")).unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}

#[test]
fn logging_rejects_bad_filter_and_installs_once() {
    let bad = RepositoryConfig {
        log_filter: "repolink_model=notalevel".into(),
        ..RepositoryConfig::new("https://repo")
    };
    assert!(matches!(init_logging(&bad), Err(ClientError::Config(_))));

    let good = RepositoryConfig::new("https://repo");
    let first = init_logging(&good).unwrap();
    let second = init_logging(&good).unwrap();
    assert!(first);
    assert!(!second);
}
