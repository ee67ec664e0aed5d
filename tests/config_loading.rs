//! Settings file discovery.

use std::path::{Path, PathBuf};

use paper_summa::config::{ConfigError, CANDIDATE_FILES};
use paper_summa::Config;
use tempfile::TempDir;

fn write_config(dir: &Path, name: &str, model: &str) -> PathBuf {
    let path = dir.join(name);
    let body = format!(
        r#"
[zotero]
user_id = 1234567
api_key = "zotero-key"
summary_tag = "AI-Summary"

[openai]
api_key = "openai-key"
base_url = "https://llm.example.org/v1"
model = "{model}"
"#
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn candidates(dir: &Path) -> Vec<PathBuf> {
    CANDIDATE_FILES.iter().map(|name| dir.join(name)).collect()
}

#[test]
fn dev_file_is_preferred() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), CANDIDATE_FILES[0], "dev-model");
    write_config(dir.path(), CANDIDATE_FILES[1], "prod-model");

    let config = Config::load_first(&candidates(dir.path())).unwrap();
    assert_eq!(config.openai.model, "dev-model");
}

#[test]
fn falls_back_to_second_candidate() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), CANDIDATE_FILES[1], "prod-model");

    let config = Config::load_first(&candidates(dir.path())).unwrap();
    assert_eq!(config.openai.model, "prod-model");
    assert_eq!(config.zotero.user_id, "1234567");
    assert_eq!(
        config.openai.base_url.as_deref(),
        Some("https://llm.example.org/v1")
    );
}

#[test]
fn no_candidate_is_an_error() {
    let dir = TempDir::new().unwrap();

    let err = Config::load_first(&candidates(dir.path())).unwrap_err();
    match err {
        ConfigError::NotFound(tried) => assert_eq!(tried, candidates(dir.path())),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CANDIDATE_FILES[0]), "[zotero\nuser_id = ").unwrap();

    let err = Config::load_first(&candidates(dir.path())).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}
