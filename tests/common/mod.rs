use async_trait::async_trait;
use elysia::error::WeatherError;
use elysia::preferences::PreferenceStore;
use elysia::storage::{ChatMessage, Sender, SqliteStorage};
use elysia::weather::{Coordinates, LocationSource, WeatherApiResponse, WeatherFetcher};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("chat.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn create_temp_preferences() -> (PreferenceStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store =
        PreferenceStore::open(tmp.path().join("preferences.db")).expect("failed to open preferences");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn message(id: &str, timestamp: i64, sender: Sender, text: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        timestamp,
        sender,
        text: text.to_string(),
    }
}

#[allow(dead_code)]
pub fn jakarta_response() -> WeatherApiResponse {
    serde_json::from_str(JAKARTA_BODY).expect("valid sample body")
}

#[allow(dead_code)]
pub const JAKARTA_BODY: &str = r#"{
    "coord": {"lon": 106.85, "lat": -6.21},
    "weather": [{"id": 803, "main": "Clouds", "description": "berawan", "icon": "04d"}],
    "main": {"temp": 31.4, "feels_like": 36.0, "temp_min": 30.0, "temp_max": 32.0,
             "pressure": 1008, "humidity": 66},
    "wind": {"speed": 2.1, "deg": 20},
    "sys": {"country": "ID", "sunrise": 1700000000, "sunset": 1700043000},
    "name": "Jakarta",
    "cod": 200
}"#;

/// Location source that counts fix requests
#[allow(dead_code)]
pub struct CountingLocation {
    pub permission: bool,
    pub fix: Option<Coordinates>,
    pub requests: AtomicUsize,
}

#[allow(dead_code)]
impl CountingLocation {
    pub fn new(permission: bool, fix: Option<Coordinates>) -> Arc<Self> {
        Arc::new(Self {
            permission,
            fix,
            requests: AtomicUsize::new(0),
        })
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for CountingLocation {
    fn has_permission(&self) -> bool {
        self.permission
    }

    async fn current_fix(&self) -> Result<Option<Coordinates>, WeatherError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.fix)
    }
}

/// Fetcher returning a scripted sequence of results
#[allow(dead_code)]
pub struct ScriptedFetcher {
    responses: Mutex<Vec<Result<WeatherApiResponse, WeatherError>>>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<WeatherApiResponse, WeatherError>>) -> Arc<Self> {
        let mut responses = responses;
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherFetcher for ScriptedFetcher {
    async fn fetch(&self, _coordinates: Coordinates) -> Result<WeatherApiResponse, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .expect("fetcher lock poisoned")
            .pop()
            .unwrap_or(Err(WeatherError::EmptyResponse))
    }
}
