//! Application state management
//! Bundles the transport, saved-printer storage and config into one owned context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::config::AppConfig;
use crate::core::bluetooth::{BlePlatform, BluestPlatform, DeviceSelector, PrinterTransport};
use crate::storage::{JsonFileStore, KeyValueStore, PrinterStorage};

/// Application state, passed explicitly to every command
pub struct AppState<P: BlePlatform = BluestPlatform, S: KeyValueStore = JsonFileStore> {
    /// The printer transport instance
    pub transport: PrinterTransport<P>,
    pub storage: PrinterStorage<S>,
    pub config: AppConfig,
}

impl AppState {
    /// Loads config from `config_dir` and opens the system Bluetooth adapter
    pub async fn new(config_dir: &Path, selector: Arc<dyn DeviceSelector>) -> Result<Self> {
        let config = AppConfig::load(config_dir).await?;
        info!("Initializing Bluetooth platform...");
        let platform = BluestPlatform::new(&config.printer, selector).await;
        let store = JsonFileStore::in_dir(config_dir);
        Ok(Self::from_parts(platform, store, config))
    }
}

impl<P: BlePlatform, S: KeyValueStore> AppState<P, S> {
    pub fn from_parts(platform: P, store: S, config: AppConfig) -> Self {
        Self {
            transport: PrinterTransport::new(platform, &config.printer),
            storage: PrinterStorage::new(store),
            config,
        }
    }
}

/// Resolves the directory holding config and storage files
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(crate::config::default_config_dir)
}
