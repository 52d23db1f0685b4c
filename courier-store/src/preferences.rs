//! Durable user preferences (language, currency).
//!
//! Reads are served from memory so the request chain never touches the
//! disk; writes go through to the JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use courier_fetch::KeyValueStorage;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_preferences_path, load_json_or_default, save_json};

/// File-backed [`KeyValueStorage`].
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Opens the preferences file at the default path.
    pub async fn open_default() -> Self {
        Self::open(default_preferences_path()).await
    }

    /// Opens the preferences file at `path`. A missing file starts empty.
    pub async fn open(path: PathBuf) -> Self {
        let values: BTreeMap<String, String> = load_json_or_default(&path).await;
        debug!(path = %path.display(), count = values.len(), "Opened preferences");
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    /// Path of the preferences file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of every stored preference.
    pub fn all(&self) -> BTreeMap<String, String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets a preference and saves the file.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let snapshot = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            values.insert(key.to_string(), value.to_string());
            values.clone()
        };
        save_json(&self.path, &snapshot).await?;
        info!(key, value, "Preference saved");
        Ok(())
    }

    /// Removes a preference and saves the file.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let snapshot = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            if values.remove(key).is_none() {
                return Ok(());
            }
            values.clone()
        };
        save_json(&self.path, &snapshot).await?;
        info!(key, "Preference removed");
        Ok(())
    }
}

impl KeyValueStorage for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use courier_fetch::host::storage::keys;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");

        let prefs = FilePreferences::open(path.clone()).await;
        assert_eq!(prefs.get(keys::LANGUAGE), None);

        prefs.set(keys::LANGUAGE, "zh-TW").await.unwrap();
        prefs.set(keys::CURRENCY, "TWD").await.unwrap();
        assert_eq!(prefs.get(keys::LANGUAGE).as_deref(), Some("zh-TW"));

        let reopened = FilePreferences::open(path).await;
        assert_eq!(reopened.get(keys::CURRENCY).as_deref(), Some("TWD"));
        assert_eq!(reopened.all().len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");

        let prefs = FilePreferences::open(path.clone()).await;
        prefs.set(keys::LANGUAGE, "en").await.unwrap();
        prefs.remove(keys::LANGUAGE).await.unwrap();
        prefs.remove("never-set").await.unwrap();

        let reopened = FilePreferences::open(path).await;
        assert_eq!(reopened.get(keys::LANGUAGE), None);
    }
}
