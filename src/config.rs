//! Configuration management for LedgerChain

use crate::blockchain::{LedgerConfig, MINING_DIFFICULTY};
use crate::error::ChainError;
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Longest possible run of leading zero hex digits in a SHA-256 hash.
pub const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            miner: MinerConfig::default(),
            discovery: DiscoveryConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Reward per block in coins.
    #[serde(default = "default_reward")]
    pub reward: f64,
    #[serde(default)]
    pub auto_mining: bool,
    #[serde(default = "default_auto_mining_interval")]
    pub auto_mining_interval_secs: u64,
    /// Hex private key of the node owner. A fresh identity is generated when
    /// unset.
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            auto_mining: false,
            auto_mining_interval_secs: default_auto_mining_interval(),
            private_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ip_offset_start")]
    pub ip_offset_start: u8,
    #[serde(default = "default_ip_offset_end")]
    pub ip_offset_end: u8,
    #[serde(default = "default_port_start")]
    pub port_start: u16,
    #[serde(default = "default_port_end")]
    pub port_end: u16,
    #[serde(default = "default_discovery_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ip_offset_start: default_ip_offset_start(),
            ip_offset_end: default_ip_offset_end(),
            port_start: default_port_start(),
            port_end: default_port_end(),
            interval_secs: default_discovery_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl DiscoveryConfig {
    pub fn ip_offsets(&self) -> RangeInclusive<u8> {
        self.ip_offset_start..=self.ip_offset_end
    }

    pub fn ports(&self) -> RangeInclusive<u16> {
        self.port_start..=self.port_end
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.network.host.is_empty() {
            return Err(ChainError::ConfigError("network.host must be set".into()));
        }
        if self.miner.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "miner.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.miner.difficulty
            )));
        }
        let reward = self.ledger_config()?.reward;
        if reward <= Amount::ZERO {
            return Err(ChainError::ConfigError(
                "miner.reward must be at least one micro-unit".into(),
            ));
        }
        if self.miner.auto_mining_interval_secs == 0 {
            return Err(ChainError::ConfigError(
                "miner.auto_mining_interval_secs must be greater than zero".into(),
            ));
        }
        if self.discovery.ip_offset_start > self.discovery.ip_offset_end {
            return Err(ChainError::ConfigError(
                "discovery.ip_offset_start must not exceed ip_offset_end".into(),
            ));
        }
        if self.discovery.port_start > self.discovery.port_end {
            return Err(ChainError::ConfigError(
                "discovery.port_start must not exceed port_end".into(),
            ));
        }
        if self.discovery.enabled && self.discovery.interval_secs == 0 {
            return Err(ChainError::ConfigError(
                "discovery.interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn ledger_config(&self) -> Result<LedgerConfig, ChainError> {
        let reward = Amount::from_coins(self.miner.reward)
            .map_err(|e| ChainError::ConfigError(format!("miner.reward: {}", e)))?;
        Ok(LedgerConfig {
            difficulty: self.miner.difficulty,
            reward,
        })
    }

    pub fn auto_mining_interval(&self) -> Duration {
        Duration::from_secs(self.miner.auto_mining_interval_secs)
    }
}

/// Reads `path` as TOML. A missing file yields the defaults; a present but
/// invalid one is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty() -> usize {
    MINING_DIFFICULTY
}

fn default_reward() -> f64 {
    1.0
}

fn default_auto_mining_interval() -> u64 {
    20
}

fn default_ip_offset_start() -> u8 {
    0
}

fn default_ip_offset_end() -> u8 {
    1
}

fn default_port_start() -> u16 {
    5000
}

fn default_port_end() -> u16 {
    5003
}

fn default_discovery_interval() -> u64 {
    20
}

fn default_probe_timeout() -> u64 {
    1000
}
