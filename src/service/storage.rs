//! Shared key-value storage area.
//!
//! Models the flat, last-write-wins local state shared between the
//! extension's processes: trigger set, variable list, fetch bookkeeping,
//! and session fields. Backed by a JSON file, cached in memory, written
//! on modification, with a change broadcast that carries the touched
//! keys.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::engine::variables::StaticVariable;
use crate::error::SnipflowResult;

pub const KEY_SHORTCUTS: &str = "shortcuts";
pub const KEY_VARIABLES: &str = "variables";
pub const KEY_LAST_FETCH: &str = "lastFetch";
pub const KEY_API_BASE_URL: &str = "apiBaseUrl";
pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_USER_EMAIL: &str = "userEmail";

/// Keys touched by one storage write.
#[derive(Debug, Clone)]
pub struct StorageChange {
    pub keys: Vec<String>,
}

/// The shared storage area.
pub struct StorageArea {
    storage_path: PathBuf,
    cache: Mutex<HashMap<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl StorageArea {
    /// Open (or create) a storage area backed by `dir/storage.json`.
    ///
    /// If the file exists it is loaded into the cache; unreadable or
    /// unparsable contents start the area empty.
    pub fn open(dir: PathBuf) -> Self {
        let storage_path = dir.join("storage.json");
        let cache = if storage_path.exists() {
            fs::read_to_string(&storage_path)
                .ok()
                .and_then(|contents| serde_json::from_str(&contents).ok())
                .unwrap_or_default()
        } else {
            HashMap::new()
        };
        let (changes, _) = broadcast::channel(16);
        Self {
            storage_path,
            cache: Mutex::new(cache),
            changes,
        }
    }

    /// Default platform location for the storage area.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("snipflow"))
            .unwrap_or_else(|| PathBuf::from(".snipflow"))
    }

    /// Subscribe to change broadcasts. Sends with no subscriber are
    /// expected and dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) -> SnipflowResult<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Write several fields as one atomic update: a single flush and a
    /// single change event, so listeners never observe a partial
    /// snapshot.
    pub fn set_many(&self, entries: Vec<(String, Value)>) -> SnipflowResult<()> {
        let keys: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
        {
            let mut cache = self.lock();
            for (key, value) in entries {
                cache.insert(key, value);
            }
            self.flush(&cache)?;
        }
        let _ = self.changes.send(StorageChange { keys });
        Ok(())
    }

    pub fn remove(&self, keys: &[&str]) -> SnipflowResult<()> {
        {
            let mut cache = self.lock();
            for key in keys {
                cache.remove(*key);
            }
            self.flush(&cache)?;
        }
        let _ = self.changes.send(StorageChange {
            keys: keys.iter().map(|key| key.to_string()).collect(),
        });
        Ok(())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn auth_token(&self) -> Option<String> {
        self.get_string(KEY_AUTH_TOKEN)
    }

    pub fn user_email(&self) -> Option<String> {
        self.get_string(KEY_USER_EMAIL)
    }

    pub fn api_base_url(&self) -> Option<String> {
        self.get_string(KEY_API_BASE_URL)
    }

    pub fn shortcuts(&self) -> Vec<String> {
        self.get(KEY_SHORTCUTS)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn variables(&self) -> Vec<StaticVariable> {
        self.get(KEY_VARIABLES)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn flush(&self, cache: &HashMap<String, Value>) -> SnipflowResult<()> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(cache)?;
        fs::write(&self.storage_path, contents)?;
        Ok(())
    }
}
