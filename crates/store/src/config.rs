//! Event store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding segment files and the rollup index
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Whether to fsync after every append.
    ///
    /// Disabling trades crash durability of the most recent events for
    /// throughput; the log stays consistent either way.
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_fsync() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fsync: default_fsync(),
        }
    }
}
