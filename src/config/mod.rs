pub mod printer_config;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::printer_config::PrinterConfig;

/// Environment variable naming the application directory
pub const HOME_ENV_VAR: &str = "RECEIPT_PRINTER_HOME";

const DEFAULT_HOME_DIR: &str = ".receipt-printer";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub printer: PrinterConfig,
}

impl AppConfig {
    pub async fn load(config_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            printer: PrinterConfig::load_config(config_dir).await?,
        })
    }
}

/// Where config and saved-printer state live: `$RECEIPT_PRINTER_HOME`, else `./.receipt-printer`
pub fn default_config_dir() -> PathBuf {
    std::env::var_os(HOME_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR))
}
