//! Helpers shared by the workcore commands

use std::fs;

use anyhow::{Context, Result};

/// Fails unless `path` names an existing regular file.
pub fn validate_file_exists(path: &str) -> Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("Cannot access input: {path}"))?;
    if !metadata.is_file() {
        anyhow::bail!("Input is not a regular file: {path}");
    }
    Ok(())
}

/// Formats a byte count with a binary unit suffix, e.g. `1.50 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
