// Configuration module for Threshold Recovery Node
//
// This module handles loading and managing the node configuration

use crate::error::{RecoveryNodeError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API configuration
    pub api: ApiConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// API port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory path
    pub data_dir: PathBuf,
    /// Audit log path; defaults to `<data_dir>/audit.log` when unset
    pub audit_log: Option<PathBuf>,
}

/// Security configuration.
///
/// Both secrets are process-level and immutable after startup. Rotating the
/// keyed-hash secret renames every stored record, so treat it like a database
/// credential, not a session key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Keyed-hash secret for storage and mailbox identifiers, hex
    pub hmac_secret: String,
    /// Master secret for sealing the node's shares at rest, hex (32 bytes)
    pub master_key: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                bind_address: default_bind_address(),
                port: default_port(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                audit_log: None,
            },
            security: SecurityConfig {
                hmac_secret: String::new(),
                master_key: String::new(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .map_err(|e| RecoveryNodeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&config_str)
            .map_err(|e| RecoveryNodeError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| RecoveryNodeError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, config_str)
            .map_err(|e| RecoveryNodeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Decode the keyed-hash secret
    pub fn hmac_secret_bytes(&self) -> Result<Vec<u8>> {
        let bytes = hex::decode(&self.security.hmac_secret)
            .map_err(|e| RecoveryNodeError::Config(format!("hmac_secret is not hex: {}", e)))?;
        if bytes.is_empty() {
            return Err(RecoveryNodeError::Config(
                "hmac_secret must not be empty".to_string(),
            ));
        }
        Ok(bytes)
    }

    /// Decode the share-sealing master key
    pub fn master_key_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.security.master_key)
            .map_err(|e| RecoveryNodeError::Config(format!("master_key is not hex: {}", e)))?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            RecoveryNodeError::Config("master_key must be exactly 32 bytes".to_string())
        })?;
        Ok(key)
    }

    /// Resolved audit log path
    pub fn audit_log_path(&self) -> PathBuf {
        self.storage
            .audit_log
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("audit.log"))
    }
}

/// Generate a default configuration file with fresh secrets at the given path
/// if it doesn't exist, then load it
pub fn ensure_default_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    if !path.as_ref().exists() {
        let mut config = Config::default();
        config.security.hmac_secret = random_hex_secret();
        config.security.master_key = random_hex_secret();
        config.to_file(&path)?;

        return Ok(config);
    }

    Config::from_file(path)
}

fn random_hex_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let generated = ensure_default_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(generated.hmac_secret_bytes().unwrap().len(), 32);
        assert_eq!(generated.master_key_bytes().unwrap().len(), 32);

        // A second call loads the same secrets instead of regenerating
        let loaded = ensure_default_config(&path).unwrap();
        assert_eq!(loaded.security.hmac_secret, generated.security.hmac_secret);
        assert_eq!(loaded.security.master_key, generated.security.master_key);
    }

    #[test]
    fn test_bad_secrets_are_rejected() {
        let mut config = Config::default();
        config.security.hmac_secret = "not hex".to_string();
        assert!(config.hmac_secret_bytes().is_err());

        config.security.hmac_secret = String::new();
        assert!(config.hmac_secret_bytes().is_err());

        config.security.master_key = "abcd".to_string();
        assert!(config.master_key_bytes().is_err());
    }
}
