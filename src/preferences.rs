//! Durable preference store
//!
//! Holds the last cached weather snapshot and the last-open timestamp in a
//! SQLite key/value table under fixed keys. A snapshot is written as a whole
//! in one transaction: present fields are stored, absent fields are removed,
//! so a partial snapshot never leaves values from an older one behind.
//!
//! Every read and write opens its own connection, so the widget loop and the
//! interactive commands can use the same file from separate processes.

use crate::error::{ElysiaError, Result};
use crate::weather::WeatherSnapshot;
use anyhow::Context;
use rusqlite::types::FromSql;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// How long a connection waits for another writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key for the cached city name
pub const CACHED_WEATHER_CITY_NAME: &str = "cached_weather_city_name";
/// Key for the cached formatted temperature
pub const CACHED_WEATHER_TEMPERATURE: &str = "cached_weather_temperature";
/// Key for the cached condition description
pub const CACHED_WEATHER_CONDITION: &str = "cached_weather_condition";
/// Key for the cached icon code
pub const CACHED_WEATHER_ICON_CODE: &str = "cached_weather_icon_code";
/// Key for the cached snapshot's last-updated timestamp (ms)
pub const CACHED_WEATHER_LAST_UPDATED: &str = "cached_weather_last_updated";
/// Key for the last time the app was opened (ms)
pub const LAST_OPEN_TIMESTAMP: &str = "last_open_timestamp";

/// Key-value store for app preferences and the weather cache
///
/// Clones share the snapshot notifier, so an observer sees snapshots saved
/// through any clone. Snapshots saved by another process are visible to
/// `weather_snapshot` but are not pushed to observers.
#[derive(Clone)]
pub struct PreferenceStore {
    db_path: PathBuf,
    weather: Arc<watch::Sender<Option<WeatherSnapshot>>>,
}

impl PreferenceStore {
    /// Open (or create) the store backed by the SQLite file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory or the table cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for preferences")
                .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        }

        let (weather, _) = watch::channel(None);
        let store = Self {
            db_path,
            weather: Arc::new(weather),
        };
        store.init()?;
        store.weather.send_replace(store.weather_snapshot());

        tracing::debug!("Opened preference store at {}", store.db_path.display());
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| {
                format!(
                    "Failed to open preference store at {}",
                    self.db_path.display()
                )
            })
            .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")
            .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value NOT NULL
            );",
        )
        .context("Failed to create preferences table")
        .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        Ok(())
    }

    /// Persist a weather snapshot, replacing the previous one entirely
    ///
    /// Observers are notified once the transaction has committed.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction fails; nothing is written and
    /// observers are not notified in that case.
    pub fn save_weather_snapshot(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let fields = [
            (CACHED_WEATHER_CITY_NAME, snapshot.city_name.as_deref()),
            (CACHED_WEATHER_TEMPERATURE, snapshot.temperature.as_deref()),
            (CACHED_WEATHER_CONDITION, snapshot.condition.as_deref()),
            (CACHED_WEATHER_ICON_CODE, snapshot.icon_code.as_deref()),
        ];

        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ElysiaError::Preferences(e.to_string()))?;

        for (key, value) in fields {
            let written = match value {
                Some(v) => tx.execute(
                    "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                    params![key, v],
                ),
                None => tx.execute("DELETE FROM preferences WHERE key = ?1", params![key]),
            };
            written
                .with_context(|| format!("Failed to write {}", key))
                .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![CACHED_WEATHER_LAST_UPDATED, snapshot.last_updated],
        )
        .context("Failed to write last updated timestamp")
        .map_err(|e| ElysiaError::Preferences(e.to_string()))?;

        tx.commit()
            .context("Failed to save weather snapshot")
            .map_err(|e| ElysiaError::Preferences(e.to_string()))?;

        self.weather.send_replace(Some(snapshot.clone()));
        tracing::debug!(
            "Saved weather snapshot for {}",
            snapshot.city_name.as_deref().unwrap_or("<unknown>")
        );
        Ok(())
    }

    /// Current weather snapshot, `None` until one has been saved
    pub fn weather_snapshot(&self) -> Option<WeatherSnapshot> {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Failed to read weather snapshot: {}", e);
                return None;
            }
        };
        read_snapshot(&conn)
    }

    /// Observe the weather snapshot
    ///
    /// Yields the current value first (`None` until a snapshot exists) and
    /// then every snapshot saved through this store.
    pub fn observe_weather_snapshot(&self) -> WatchStream<Option<WeatherSnapshot>> {
        WatchStream::new(self.weather.subscribe())
    }

    /// Record when the app was last opened
    pub fn record_last_open(&self, timestamp_ms: i64) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![LAST_OPEN_TIMESTAMP, timestamp_ms],
        )
        .context("Failed to record last open")
        .map_err(|e| ElysiaError::Preferences(e.to_string()))?;
        Ok(())
    }

    /// When the app was last opened, if ever
    pub fn last_open(&self) -> Option<i64> {
        let conn = self.connect().ok()?;
        read_value(&conn, LAST_OPEN_TIMESTAMP)
    }
}

fn read_snapshot(conn: &Connection) -> Option<WeatherSnapshot> {
    let last_updated = read_value(conn, CACHED_WEATHER_LAST_UPDATED)?;
    Some(WeatherSnapshot {
        city_name: read_value(conn, CACHED_WEATHER_CITY_NAME),
        temperature: read_value(conn, CACHED_WEATHER_TEMPERATURE),
        condition: read_value(conn, CACHED_WEATHER_CONDITION),
        icon_code: read_value(conn, CACHED_WEATHER_ICON_CODE),
        last_updated,
    })
}

/// Read one value; a missing key or a value of the wrong type reads as absent
fn read_value<T: FromSql>(conn: &Connection, key: &str) -> Option<T> {
    let result = conn
        .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![key],
            |row| row.get::<_, T>(0),
        )
        .optional();
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring unreadable preference {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_preferences, jakarta_snapshot};
    use tempfile::tempdir;
    use tokio_stream::StreamExt;

    fn raw_connection(store: &PreferenceStore) -> Connection {
        Connection::open(&store.db_path).unwrap()
    }

    #[test]
    fn test_empty_store_has_no_snapshot() {
        let (store, _dir) = create_test_preferences();
        assert!(store.weather_snapshot().is_none());
        assert!(store.last_open().is_none());
    }

    #[test]
    fn test_save_and_read_snapshot() {
        let (store, _dir) = create_test_preferences();
        store.save_weather_snapshot(&jakarta_snapshot(1_000)).unwrap();
        assert_eq!(store.weather_snapshot(), Some(jakarta_snapshot(1_000)));
    }

    #[test]
    fn test_partial_snapshot_removes_stale_fields() {
        let (store, _dir) = create_test_preferences();
        store.save_weather_snapshot(&jakarta_snapshot(1_000)).unwrap();

        let partial = WeatherSnapshot {
            city_name: Some("Bandung".to_string()),
            temperature: None,
            condition: None,
            icon_code: None,
            last_updated: 2_000,
        };
        store.save_weather_snapshot(&partial).unwrap();

        assert_eq!(store.weather_snapshot(), Some(partial));
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        {
            let store = PreferenceStore::open(&path).unwrap();
            store.save_weather_snapshot(&jakarta_snapshot(42)).unwrap();
            store.record_last_open(7).unwrap();
        }
        let store = PreferenceStore::open(&path).unwrap();
        assert_eq!(store.weather_snapshot(), Some(jakarta_snapshot(42)));
        assert_eq!(store.last_open(), Some(7));
    }

    #[test]
    fn test_two_handles_share_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let widget = PreferenceStore::open(&path).unwrap();
        let app = PreferenceStore::open(&path).unwrap();

        widget.save_weather_snapshot(&jakarta_snapshot(10)).unwrap();
        app.record_last_open(11).unwrap();
        assert_eq!(app.weather_snapshot(), Some(jakarta_snapshot(10)));

        app.save_weather_snapshot(&jakarta_snapshot(20)).unwrap();
        assert_eq!(widget.weather_snapshot(), Some(jakarta_snapshot(20)));
        assert_eq!(widget.last_open(), Some(11));
    }

    #[test]
    fn test_corrupt_timestamp_treated_as_absent() {
        let (store, _dir) = create_test_preferences();
        raw_connection(&store)
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, 'bad')",
                params![CACHED_WEATHER_LAST_UPDATED],
            )
            .unwrap();
        assert!(store.weather_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot_and_observers() {
        let (store, _dir) = create_test_preferences();
        store.save_weather_snapshot(&jakarta_snapshot(1_000)).unwrap();
        let mut stream = store.observe_weather_snapshot();
        let current = stream.next().await.unwrap();
        assert_eq!(current, Some(jakarta_snapshot(1_000)));

        raw_connection(&store)
            .execute_batch(
                "CREATE TRIGGER reject_timestamp BEFORE INSERT ON preferences
                 WHEN NEW.key = 'cached_weather_last_updated'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let mut newer = jakarta_snapshot(2_000);
        newer.city_name = Some("Bandung".to_string());
        assert!(store.save_weather_snapshot(&newer).is_err());

        assert_eq!(store.weather_snapshot(), Some(jakarta_snapshot(1_000)));
        let pending = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(pending.is_err(), "observer must not see an uncommitted snapshot");
    }

    #[tokio::test]
    async fn test_observe_emits_none_then_snapshot() {
        let (store, _dir) = create_test_preferences();
        let mut stream = store.observe_weather_snapshot();

        let first = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.is_none());

        store.save_weather_snapshot(&jakarta_snapshot(5)).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, Some(jakarta_snapshot(5)));
    }
}
