//! Configuration loading, defaults, and the persisted corpus-file rename.

use std::path::Path;

use quotescrape::config::{ConfigError, ScraperConfig};
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn empty_object_loads_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.json", "{}");

    let config = ScraperConfig::load(&path).unwrap();
    assert_eq!(config.site.base_url, "https://quotes.toscrape.com");
    assert_eq!(config.credentials.username, "admin");
    assert_eq!(config.behavior.pages_to_scrape, 5);
    assert_eq!(config.behavior.total_pages, 10);
    assert_eq!(config.behavior.retry_attempts, 3);
    assert_eq!(config.files.corpus_file, "quotes.json");
    assert!(config.browser.headless);
}

#[test]
fn partial_file_keeps_defaults_for_missing_groups() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.json",
        r#"{"behavior": {"total_pages": 42}, "credentials": {"username": "alice"}}"#,
    );

    let config = ScraperConfig::load(&path).unwrap();
    assert_eq!(config.behavior.total_pages, 42);
    // untouched fields inside a present group keep their defaults too
    assert_eq!(config.behavior.pages_to_scrape, 5);
    assert_eq!(config.credentials.username, "alice");
    assert_eq!(config.credentials.password, "admin");
}

#[test]
fn missing_file_is_fatal() {
    let err = ScraperConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn non_json_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.toml", "{}");

    let err = ScraperConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotJson(_)));
}

#[test]
fn malformed_json_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.json", "{ nope");

    let err = ScraperConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed { .. }));
}

#[test]
fn set_corpus_file_rewrites_only_the_persisted_name() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "config.json",
        r#"{"files": {"directory": "./out"}, "behavior": {"total_pages": 7}}"#,
    );

    ScraperConfig::set_corpus_file("archive", &path).unwrap();

    let reloaded = ScraperConfig::load(&path).unwrap();
    assert_eq!(reloaded.files.corpus_file, "archive.json");
    // the rest of the file is preserved
    assert_eq!(reloaded.files.directory, std::path::PathBuf::from("./out"));
    assert_eq!(reloaded.behavior.total_pages, 7);
}

#[test]
fn set_corpus_file_keeps_an_existing_json_suffix() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.json", "{}");

    ScraperConfig::set_corpus_file("archive.json", &path).unwrap();

    let reloaded = ScraperConfig::load(&path).unwrap();
    assert_eq!(reloaded.files.corpus_file, "archive.json");
}

#[test]
fn set_corpus_file_rejects_blank_names() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "config.json", "{}");

    let err = ScraperConfig::set_corpus_file("  ", &path).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyFileName));
}

#[test]
fn page_url_is_built_from_the_base_url() {
    let config = ScraperConfig::default();
    assert_eq!(
        config.site.page_url(3),
        "https://quotes.toscrape.com/page/3/"
    );

    let mut config = ScraperConfig::default();
    config.site.base_url = "http://localhost:8080/".to_string();
    assert_eq!(config.site.page_url(1), "http://localhost:8080/page/1/");
}

#[test]
fn retry_policy_never_drops_below_one_attempt() {
    let mut config = ScraperConfig::default();
    config.behavior.retry_attempts = 0;
    assert_eq!(config.retry_policy().attempts, 1);
}

#[test]
fn output_paths_are_rooted_in_the_configured_directory() {
    let mut config = ScraperConfig::default();
    config.files.directory = std::path::PathBuf::from("/data/quotes");
    assert_eq!(
        config.corpus_path(),
        std::path::PathBuf::from("/data/quotes/quotes.json")
    );
    assert_eq!(
        config.author_path(),
        std::path::PathBuf::from("/data/quotes/author_quotes.json")
    );
}
