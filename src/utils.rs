use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::fs;

/// Creates `path` and its parents when missing. Idempotent.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if fs::try_exists(path).await.unwrap_or(false) {
        debug!("Directory {:?} already exists", path);
        return Ok(());
    }
    fs::create_dir_all(path)
        .await
        .with_context(|| format!("Failed to create directory at {:?}", path))?;
    info!("Created directory at: {:?}", path);
    Ok(())
}
