use std::{
    fs::{create_dir_all, write},
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use serde::Serialize;
use tracing::info;

/// Writes `value` as pretty JSON to `output_dir/name`, creating parent directories.
pub fn write_json<T: Serialize>(output_dir: &Path, name: &str, value: &T) -> anyhow::Result<PathBuf> {
    let path = output_dir.join(name);
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .map_err(|err| anyhow!("Failed to create {}: {err:?}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    write(&path, contents).map_err(|err| anyhow!("Failed to write {}: {err:?}", path.display()))?;
    info!("Written: {}", path.display());
    Ok(path)
}
