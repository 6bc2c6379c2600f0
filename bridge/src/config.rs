//! Configuration for the bridge.
//!
//! Settings come either from command line flags (each with an environment
//! variable fallback) or, when `--config` is given, from a YAML file.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_CLICKHOUSE_ADDRESS: &str = "http://127.0.0.1:8123";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9119";
const DEFAULT_TABLE: &str = "metrics";

/// CLI arguments for the bridge.
#[derive(Parser, Debug)]
#[command(name = "clickhouse-bridge")]
#[command(about = "Receives Prometheus remote write pushes and stores them in ClickHouse")]
pub struct CliArgs {
    /// Path to a YAML configuration file. Replaces all other flags.
    #[arg(short, long, env = "BRIDGE_CONFIG_FILE")]
    pub config: Option<String>,

    /// Address of the ClickHouse HTTP interface
    #[arg(long, default_value = DEFAULT_CLICKHOUSE_ADDRESS, env = "CLICKHOUSE_ADDRESS")]
    pub clickhouse_address: String,

    /// Database holding the metrics table
    #[arg(long, env = "CLICKHOUSE_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "CLICKHOUSE_USER")]
    pub user: Option<String>,

    #[arg(long, env = "CLICKHOUSE_PASSWORD")]
    pub password: Option<String>,

    /// Table rows are inserted into
    #[arg(long, default_value = DEFAULT_TABLE, env = "CLICKHOUSE_TABLE")]
    pub table: String,

    /// Listen address for the bridge process
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR, env = "LISTEN_ADDR")]
    pub listen_addr: SocketAddr,

    /// Deadline for each request's begin and row inserts, e.g. "5s"
    #[arg(long, env = "WRITE_TIMEOUT")]
    pub write_timeout: Option<humantime::Duration>,
}

impl CliArgs {
    /// Resolve the effective configuration.
    pub fn to_config(&self) -> Result<BridgeConfig> {
        if let Some(path) = &self.config {
            return load_config(path);
        }
        Ok(BridgeConfig {
            listen_addr: self.listen_addr,
            store: StoreConfig::ClickHouse(ClickHouseConfig {
                address: self.clickhouse_address.clone(),
                database: self.database.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
                table: self.table.clone(),
            }),
            write_timeout_secs: self.write_timeout.as_ref().map(|d| d.as_secs_f64()),
        })
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default)]
    pub store: StoreConfig,

    /// Deadline in seconds for each request's begin and row inserts.
    /// No deadline when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout_secs: Option<f64>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9119))
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            store: StoreConfig::default(),
            write_timeout_secs: None,
        }
    }
}

impl BridgeConfig {
    pub fn write_timeout(&self) -> Result<Option<Duration>> {
        self.write_timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    Error::InvalidConfig(format!("write_timeout_secs {}: {}", secs, e))
                })
            })
            .transpose()
    }
}

/// Backing store configuration.
///
/// Defaults to a local ClickHouse server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StoreConfig {
    InMemory,
    ClickHouse(ClickHouseConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::ClickHouse(ClickHouseConfig::default())
    }
}

/// ClickHouse connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClickHouseConfig {
    /// URL of the HTTP interface.
    #[serde(default = "default_clickhouse_address")]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_table")]
    pub table: String,
}

fn default_clickhouse_address() -> String {
    DEFAULT_CLICKHOUSE_ADDRESS.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            address: default_clickhouse_address(),
            database: None,
            user: None,
            password: None,
            table: default_table(),
        }
    }
}

/// Load configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BridgeConfig> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| Error::InvalidConfig(format!("Failed to read config file: {}", e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse config file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_local_clickhouse() {
        // given
        let args = CliArgs::parse_from(["clickhouse-bridge"]);

        // when
        let config = args.to_config().unwrap();

        // then
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9119");
        assert_eq!(config.write_timeout().unwrap(), None);
    }

    #[test]
    fn should_build_config_from_flags() {
        // given
        let args = CliArgs::parse_from([
            "clickhouse-bridge",
            "--clickhouse-address",
            "http://ch:8123",
            "--listen-addr",
            "127.0.0.1:9200",
            "--table",
            "samples",
            "--database",
            "prom",
            "--write-timeout",
            "5s",
        ]);

        // when
        let config = args.to_config().unwrap();

        // then
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9200");
        assert_eq!(
            config.store,
            StoreConfig::ClickHouse(ClickHouseConfig {
                address: "http://ch:8123".to_string(),
                database: Some("prom".to_string()),
                user: None,
                password: None,
                table: "samples".to_string(),
            })
        );
        assert_eq!(config.write_timeout().unwrap(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn should_deserialize_in_memory_config() {
        // given
        let yaml = r#"
listen_addr: 127.0.0.1:9300
store:
  type: InMemory
"#;

        // when
        let config: BridgeConfig = serde_yaml::from_str(yaml).unwrap();

        // then
        assert_eq!(config.store, StoreConfig::InMemory);
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:9300");
    }

    #[test]
    fn should_deserialize_clickhouse_config_with_defaults() {
        // given
        let yaml = r#"
store:
  type: ClickHouse
  address: http://clickhouse:8123
write_timeout_secs: 2.5
"#;

        // when
        let config: BridgeConfig = serde_yaml::from_str(yaml).unwrap();

        // then
        match &config.store {
            StoreConfig::ClickHouse(ch) => {
                assert_eq!(ch.address, "http://clickhouse:8123");
                assert_eq!(ch.table, "metrics");
                assert!(ch.database.is_none());
            }
            _ => panic!("Expected ClickHouse config"),
        }
        assert_eq!(
            config.write_timeout().unwrap(),
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn should_reject_negative_write_timeout() {
        // given
        let config = BridgeConfig {
            write_timeout_secs: Some(-1.0),
            ..Default::default()
        };

        // when
        let result = config.write_timeout();

        // then
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn should_fail_to_load_missing_file() {
        // given/when
        let result = load_config("/nonexistent/bridge.yaml");

        // then
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
