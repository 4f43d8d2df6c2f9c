use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use trawl_common::{DelayRange, StealthLevel};
use trawl_config::TrawlConfigLoader;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
driver:
  explicit_path: /opt/drivers/chromedriver
  max_search_depth: 3
session:
  headless: true
  stealth_level: maximum
crawl:
  politeness_delay:
    min_ms: 500
    max_ms: 900
auth:
  email: "${TRAWL_IT_EMAIL}"
  password: "${TRAWL_IT_PASSWORD}"
  "#;
    let p = write_yaml(&tmp, "trawl.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("TRAWL_IT_EMAIL", Some("ada@example.com")),
            ("TRAWL_IT_PASSWORD", Some("s3cret")),
        ],
        || {
            let config = TrawlConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(
                config.driver.explicit_path.as_deref(),
                Some(std::path::Path::new("/opt/drivers/chromedriver"))
            );
            assert_eq!(config.driver.max_search_depth, 3);
            assert!(config.session.headless);
            assert_eq!(config.session.stealth_level, StealthLevel::Maximum);
            assert_eq!(config.crawl.politeness_delay, DelayRange::new(500, 900));
            // untouched sections keep their defaults
            assert_eq!(config.crawl.settle_delay, DelayRange::from_secs(1, 2));
            assert_eq!(config.auth.email.as_deref(), Some("ada@example.com"));
            assert_eq!(config.auth.password.as_deref(), Some("s3cret"));
        },
    );
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "trawl.yaml", "crawl:\n  page_timeout_secs: 12\n");

    temp_env::with_vars(
        [
            ("TRAWL__CRAWL__PAGE_TIMEOUT_SECS", Some("30")),
            ("TRAWL__SESSION__HEADLESS", Some("true")),
        ],
        || {
            let config = TrawlConfigLoader::new().with_file(&p).load().unwrap();
            assert_eq!(config.crawl.page_timeout_secs, 30);
            assert!(config.session.headless);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = TrawlConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(config.crawl.page_timeout_secs, 10);
    assert_eq!(config.auth.login_url, "https://www.linkedin.com/login");
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = TrawlConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn numeric_looking_env_strings_stay_strings() {
    temp_env::with_vars(
        [
            ("TRAWL__AUTH__PASSWORD", Some("123456")),
            ("TRAWL__AUTH__EMAIL", Some("42")),
            ("TRAWL__DRIVER__EXPLICIT_PATH", Some("1234")),
            ("TRAWL__CRAWL__SETTLE_DELAY__MIN_MS", Some("1000")),
            ("TRAWL__CRAWL__SETTLE_DELAY__MAX_MS", Some("2500")),
        ],
        || {
            let config = TrawlConfigLoader::new().load().expect("load config");
            assert_eq!(config.auth.password.as_deref(), Some("123456"));
            assert_eq!(config.auth.email.as_deref(), Some("42"));
            assert_eq!(
                config.driver.explicit_path,
                Some(PathBuf::from("1234"))
            );
            assert_eq!(config.crawl.settle_delay, DelayRange::new(1000, 2500));
        },
    );
}

#[test]
#[serial]
fn expanded_placeholder_with_digits_is_a_string() {
    temp_env::with_var("TRAWL_IT_PIN", Some("0042"), || {
        let config = TrawlConfigLoader::new()
            .with_yaml_str("auth:\n  password: \"${TRAWL_IT_PIN}\"\n")
            .load()
            .expect("load config");
        assert_eq!(config.auth.password.as_deref(), Some("0042"));
    });
}

#[test]
#[serial]
fn driver_download_is_on_by_default_and_switchable_from_env() {
    let config = TrawlConfigLoader::new().load().expect("defaults");
    assert!(config.driver.auto_download);
    assert!(config.driver.index_url.is_none());

    temp_env::with_vars(
        [
            ("TRAWL__DRIVER__AUTO_DOWNLOAD", Some("false")),
            ("TRAWL__DRIVER__INDEX_URL", Some("http://127.0.0.1:9/index.json")),
        ],
        || {
            let config = TrawlConfigLoader::new().load().expect("load config");
            assert!(!config.driver.auto_download);
            assert_eq!(
                config.driver.index_url.as_deref(),
                Some("http://127.0.0.1:9/index.json")
            );
        },
    );
}
