//! Daemon configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or none at all) yields a
//! runnable config. Example:
//!
//! ```toml
//! [server]
//! port = 8087
//!
//! [consul]
//! agent_address = "127.0.0.1:8500"
//!
//! [roster]
//! interval = "15m"
//!
//! [roster.service]
//! id = "pdq"
//! name = "stator"
//! tags = ["metrics"]
//!
//! [collectors]
//! disk_paths = ["/", "/boot/efi"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use stator_roster::{ConsulConfig, RosterConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Build version, not read from file.
    #[serde(skip_deserializing)]
    pub version: String,
    pub server: ServerConfig,
    pub consul: ConsulConfig,
    pub roster: RosterConfig,
    pub collectors: CollectorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            consul: ConsulConfig::default(),
            roster: RosterConfig::default(),
            collectors: CollectorsConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    /// 0 binds an ephemeral port, which is then registered.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8087,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorsConfig {
    /// Filesystems reported by the disk usage collector.
    pub disk_paths: Vec<String>,
    /// Include the synthetic waveform series.
    pub wave: bool,
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            disk_paths: vec!["/".to_string()],
            wave: true,
        }
    }
}
