//! Configuration file support for the `workcore` command.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use workcore_chunks::CompressOptions;
use workcore_workflow::PoolConfig;

/// Contents of a `--config` JSON file. Every section and field is optional.
///
/// ```json
/// {
///   "pool": { "size": 4, "thread_name_prefix": "worker" },
///   "compress": { "chunk_size": 65536, "level": 9, "pooled": true }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmdConfig {
    pub pool: PoolConfig,
    pub compress: CompressOptions,
}

impl CmdConfig {
    /// Loads the configuration at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<CmdConfig> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(CmdConfig::default()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<CmdConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
