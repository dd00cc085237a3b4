//! Configuration for the bounty ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Setting key for the advertised reward allocation
pub const SETTING_ALLOCATION: &str = "allocation";
/// Setting key for the share allotment granted at registration
pub const SETTING_INITIAL_SHARES: &str = "initial_shares";
/// Setting key for the share amount awarded per bump
pub const SETTING_BUMP_SHARES: &str = "bump_shares";
/// Setting key for the share amount awarded on joining a bounty
pub const SETTING_OTJ_SHARES: &str = "otj_shares";

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Credential for the chat transport; the engine itself never reads it
    #[serde(default)]
    pub transport_token: Option<String>,

    /// Compile-time fallbacks for the runtime settings table
    pub defaults: SettingsDefaults,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/bounty-ledger"),
            service_name: "bounty-ledger".to_string(),
            transport_token: None,
            defaults: SettingsDefaults::default(),
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// Fallback values for the settings table
///
/// The durable store may overlay any of these per key; unset keys resolve
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDefaults {
    /// Advertised reward allocation label
    pub allocation: String,

    /// Shares granted at registration
    pub initial_shares: i64,

    /// Shares awarded per bump
    pub bump_shares: i64,

    /// Shares awarded on joining a bounty
    pub otj_shares: i64,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            allocation: "$100".to_string(),
            initial_shares: 10,
            bump_shares: 1,
            otj_shares: 1,
        }
    }
}

impl SettingsDefaults {
    /// Fallback value for `key`, rendered as a string
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            SETTING_ALLOCATION => Some(self.allocation.clone()),
            SETTING_INITIAL_SHARES => Some(self.initial_shares.to_string()),
            SETTING_BUMP_SHARES => Some(self.bump_shares.to_string()),
            SETTING_OTJ_SHARES => Some(self.otj_shares.to_string()),
            _ => None,
        }
    }

    /// Fallback share amount for `key`, if the key is numeric
    pub fn amount(&self, key: &str) -> Option<i64> {
        match key {
            SETTING_INITIAL_SHARES => Some(self.initial_shares),
            SETTING_BUMP_SHARES => Some(self.bump_shares),
            SETTING_OTJ_SHARES => Some(self.otj_shares),
            _ => None,
        }
    }

    /// All fallback keys and values, in display order
    pub fn pairs(&self) -> Vec<(String, String)> {
        vec![
            (SETTING_ALLOCATION.to_string(), self.allocation.clone()),
            (
                SETTING_BUMP_SHARES.to_string(),
                self.bump_shares.to_string(),
            ),
            (
                SETTING_INITIAL_SHARES.to_string(),
                self.initial_shares.to_string(),
            ),
            (SETTING_OTJ_SHARES.to_string(), self.otj_shares.to_string()),
        ]
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
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

        if let Ok(data_dir) = std::env::var("BOUNTY_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(token) = std::env::var("BOUNTY_TRANSPORT_TOKEN") {
            config.transport_token = Some(token);
        }

        Ok(config)
    }
}
