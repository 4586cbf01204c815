//! Persisted user preferences.
//!
//! The only preference is the last search text, stored under the
//! `user_input` key of a small JSON document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::live::LiveFeed;

/// A key-value store holding the last search text.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the last saved search text. Returns an empty string if none was saved.
    async fn load_user_input(&self) -> Result<String>;

    /// Persist the search text, replacing any previous value.
    async fn save_user_input(&self, text: &str) -> Result<()>;
}

/// Read the last search text from `store`.
///
/// A failed read is logged and treated as no saved text.
pub async fn last_user_input(store: &dyn SettingsStore) -> String {
    match store.load_user_input().await {
        Ok(text) => text,
        Err(e) => {
            warn!("Error loading last search, starting blank: {}", e);
            String::new()
        }
    }
}

/// On-disk layout of the preferences document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PreferencesDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_input: Option<String>,
}

/// [`SettingsStore`] backed by a JSON file.
///
/// Writes go to a temporary file that is renamed over the original, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug)]
pub struct UserPreferences {
    path: PathBuf,
    current: watch::Sender<String>,
    write_lock: Mutex<()>,
}

impl UserPreferences {
    /// Open the preferences file at `path`.
    ///
    /// A missing or unreadable file is not an error: the store starts with an
    /// empty search text and the file is created on the first save.
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let initial = match read_document(&path) {
            Ok(doc) => doc.user_input.unwrap_or_default(),
            Err(e) => {
                warn!("Error reading preferences, starting empty: {}", e);
                String::new()
            }
        };

        debug!("Opened preferences at {}", path.display());
        Self {
            path,
            current: watch::channel(initial).0,
            write_lock: Mutex::new(()),
        }
    }

    /// Path to the preferences file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last search text as a live feed.
    ///
    /// Yields the current value immediately and again after every save. The
    /// feed ends when the store is closed.
    #[must_use]
    pub fn user_input(&self) -> LiveFeed<String> {
        let mut rx = self.current.subscribe();
        LiveFeed::spawn(move |tx| async move {
            loop {
                let value = rx.borrow_and_update().clone();
                if tx.send(value).await.is_err() {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Close the store, ending every live feed.
    pub fn close(self) {
        debug!("Closed preferences at {}", self.path.display());
    }
}

#[async_trait]
impl SettingsStore for UserPreferences {
    async fn load_user_input(&self) -> Result<String> {
        let doc = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => parse_document(&self.path, &json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PreferencesDocument::default(),
            Err(e) => {
                return Err(Error::PreferencesRead {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        Ok(doc.user_input.unwrap_or_default())
    }

    async fn save_user_input(&self, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let doc = PreferencesDocument {
            user_input: Some(text.to_string()),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let write_err = |source: std::io::Error| Error::PreferencesWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_err)?;

        self.current.send_replace(text.to_string());
        debug!("Saved user input ({} chars)", text.chars().count());
        Ok(())
    }
}

/// Volatile [`SettingsStore`] kept in memory.
#[derive(Debug, Default)]
pub struct MemorySettings {
    user_input: std::sync::Mutex<String>,
}

impl MemorySettings {
    /// A store that already holds `text`.
    #[must_use]
    pub fn with_user_input(text: impl Into<String>) -> Self {
        Self {
            user_input: std::sync::Mutex::new(text.into()),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load_user_input(&self) -> Result<String> {
        self.user_input
            .lock()
            .map(|text| text.clone())
            .map_err(|_| Error::internal("settings mutex poisoned"))
    }

    async fn save_user_input(&self, text: &str) -> Result<()> {
        let mut current = self
            .user_input
            .lock()
            .map_err(|_| Error::internal("settings mutex poisoned"))?;
        *current = text.to_string();
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<PreferencesDocument> {
    match std::fs::read_to_string(path) {
        Ok(json) => parse_document(path, &json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PreferencesDocument::default()),
        Err(e) => Err(Error::PreferencesRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn parse_document(path: &Path, json: &str) -> Result<PreferencesDocument> {
    serde_json::from_str(json).map_err(|e| Error::PreferencesRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = UserPreferences::open(dir.path().join("preferences.json"));
        assert_eq!(prefs.load_user_input().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let prefs = UserPreferences::open(&path);
        prefs.save_user_input("Lisbon").await.unwrap();
        assert_eq!(prefs.load_user_input().await.unwrap(), "Lisbon");
        prefs.close();

        let reopened = UserPreferences::open(&path);
        assert_eq!(reopened.load_user_input().await.unwrap(), "Lisbon");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_uses_user_input_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let prefs = UserPreferences::open(&path);
        prefs.save_user_input("OPO").await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["user_input"], "OPO");
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{ not json").unwrap();

        let prefs = UserPreferences::open(&path);
        let err = prefs.load_user_input().await.unwrap_err();
        assert!(err.is_preferences_error());

        let mut feed = prefs.user_input();
        assert_eq!(feed.next().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_user_input_feed_follows_saves() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = UserPreferences::open(dir.path().join("preferences.json"));

        let mut feed = prefs.user_input();
        assert_eq!(feed.next().await.unwrap(), "");

        prefs.save_user_input("MUC").await.unwrap();
        assert_eq!(feed.next().await.unwrap(), "MUC");

        prefs.close();
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_last_user_input_recovers_from_bad_file() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let prefs = UserPreferences::open(&path);
        assert!(prefs.load_user_input().await.is_err());
        assert_eq!(last_user_input(&prefs).await, "");

        prefs.save_user_input("MUC").await.unwrap();
        assert_eq!(last_user_input(&prefs).await, "MUC");
    }

    #[tokio::test]
    async fn test_memory_settings() {
        let settings = MemorySettings::with_user_input("LIS");
        assert_eq!(settings.load_user_input().await.unwrap(), "LIS");

        settings.save_user_input("").await.unwrap();
        assert_eq!(settings.load_user_input().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let prefs = UserPreferences::open(blocker.join("preferences.json"));
        let err = prefs.save_user_input("x").await.unwrap_err();
        assert!(matches!(err, Error::PreferencesWrite { .. }));
    }
}
