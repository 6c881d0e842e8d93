use std::path::Path;

use anyhow::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::bluetooth::{
    DEFAULT_CHUNK_DELAY_MS, DEFAULT_CHUNK_SIZE, DEFAULT_SCAN_DURATION_SECS,
};
use crate::utils::ensure_directory_exists;

const CONFIG_FILE_NAME: &str = "printer_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Bytes per GATT write.
    /// 20 fits the default BLE 4.0 payload; larger values need a negotiated MTU.
    pub chunk_size: usize,

    /// Pause between chunk writes so the printer's receive buffer keeps up.
    pub chunk_delay_ms: u64,

    /// How long each discovery request listens for advertisements.
    pub scan_duration_secs: u64,

    /// Ignore advertisements weaker than this RSSI (dBm).
    pub min_rssi: Option<i16>,

    /// Auto-select the first device whose name contains this text.
    pub device_name_filter: Option<String>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        PrinterConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
            scan_duration_secs: DEFAULT_SCAN_DURATION_SECS,
            min_rssi: None,
            device_name_filter: None,
        }
    }
}

impl PrinterConfig {
    /// Loads the config from `config_dir`, falling back to defaults.
    pub async fn load_config(config_dir: &Path) -> Result<Self> {
        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(&file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the current config into `config_dir`.
    pub async fn save_config(&self, config_dir: &Path) -> Result<()> {
        ensure_directory_exists(config_dir).await?;

        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize printer config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(&file_path, config_json).await?;

        info!("Printer config saved to {:?}.", file_path_str);
        Ok(())
    }
}
