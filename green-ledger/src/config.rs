//! Configuration for the credit ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/green-ledger"),
            service_name: "green-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("GREEN_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        Ok(config)
    }
}
