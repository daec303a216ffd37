//! Test utilities for Elysia
//!
//! Temporary stores, sample weather data, and assertion helpers shared by
//! the unit tests.

use crate::config::Config;
use crate::error::ElysiaError;
use crate::preferences::PreferenceStore;
use crate::storage::SqliteStorage;
use crate::weather::WeatherSnapshot;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Panics
///
/// Panics if the directory cannot be created
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a message store backed by a database inside a fresh temp dir
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn create_test_storage() -> (SqliteStorage, TempDir) {
    let dir = temp_dir();
    let storage = SqliteStorage::new_with_path(dir.path().join("chat.db"))
        .expect("Failed to create test storage");
    (storage, dir)
}

/// Create a preference store inside a fresh temp dir
pub fn create_test_preferences() -> (PreferenceStore, TempDir) {
    let dir = temp_dir();
    let store =
        PreferenceStore::open(dir.path().join("preferences.db")).expect("Failed to open preferences");
    (store, dir)
}

/// Create a test file with the given content
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// A complete Jakarta snapshot taken at `last_updated`
pub fn jakarta_snapshot(last_updated: i64) -> WeatherSnapshot {
    WeatherSnapshot {
        city_name: Some("Jakarta".to_string()),
        temperature: Some("30°C".to_string()),
        condition: Some("Cerah".to_string()),
        icon_code: Some("01d".to_string()),
        last_updated,
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, ElysiaError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
weather:
  api_key: test-key-12345
  stale_after_minutes: 30
  location_timeout_seconds: 15

location:
  source: fixed
  latitude: -6.2088
  longitude: 106.8456
  permission_granted: true

storage:
  database_file: chat.db
  preferences_file: preferences.db

widget:
  refresh_interval_minutes: 30
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_storage_is_empty() {
        let (storage, dir) = create_test_storage();
        assert!(dir.path().join("chat.db").exists());
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.json", "{}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<(), ElysiaError> =
            Err(ElysiaError::Config("test error message".to_string()));
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<(), ElysiaError> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_test_config_yaml_parses_and_validates() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.validate_for_refresh().is_ok());
        assert!(config.location.permission_granted);
        assert!(test_config().validate().is_ok());
    }
}
