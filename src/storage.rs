//! Persistent storage for the last connected printer
//! A small key-value store abstraction with a JSON file backend.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::core::bluetooth::PrinterDevice;
use crate::utils::ensure_directory_exists;

/// Key under which the saved printer is stored
pub const SAVED_PRINTER_KEY: &str = "saved_printer";

const STORAGE_FILE_NAME: &str = "storage.json";

/// Durable string key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// All entries in one JSON object file, rewritten on every change
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Store backed by `storage.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(STORAGE_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&json).with_context(|| format!("Corrupt storage file {:?}", self.path))
    }

    async fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_directory_exists(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", self.path))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }
}

/// In-process store; contents are lost on exit
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// The printer remembered for reconnecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPrinter {
    pub id: String,
    pub name: String,
    /// RFC 3339 UTC timestamp
    pub saved_at: String,
}

/// Saves, loads and forgets the last connected printer
pub struct PrinterStorage<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PrinterStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn save_printer(&self, printer: &PrinterDevice) -> Result<SavedPrinter> {
        let saved = SavedPrinter {
            id: printer.id.clone(),
            name: printer.name.clone(),
            saved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let json = serde_json::to_string(&saved)?;
        self.store.set(SAVED_PRINTER_KEY, &json).await?;
        info!("Saved printer {} ({})", saved.name, saved.id);
        Ok(saved)
    }

    /// The saved printer; unreadable records are logged and treated as absent
    pub async fn get_saved_printer(&self) -> Option<SavedPrinter> {
        let data = match self.store.get(SAVED_PRINTER_KEY).await {
            Ok(data) => data?,
            Err(e) => {
                error!("Error loading saved printer: {:#}", e);
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(saved) => Some(saved),
            Err(e) => {
                error!("Error parsing saved printer: {}", e);
                None
            }
        }
    }

    pub async fn remove_saved_printer(&self) -> Result<()> {
        self.store.remove(SAVED_PRINTER_KEY).await?;
        info!("Saved printer forgotten");
        Ok(())
    }
}
