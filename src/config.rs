use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::purger::{MAX_AGE_SECS, PURGE_PERIOD_SECS};
use crate::stats::dump::DUMP_PERIOD_SECS;
use crate::stats::snapshot::STATS_BLOCK_COUNT;
use crate::watchdog::MAX_DISCONNECT_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sled,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(StoreBackend::Sled),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend {other:?}")),
        }
    }
}

/// Runtime settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rpc_url: String,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub output_file: String,
    pub purge_period: Duration,
    pub dump_period: Duration,
    /// Retention ceiling, seconds.
    pub max_age: i64,
    /// Watchdog timeout, seconds.
    pub max_disconnect: i64,
    pub watchdog_interval: Duration,
    pub stats_block_count: usize,
    pub poll_interval: Duration,
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            data_dir: PathBuf::from("./database"),
            store_backend: StoreBackend::Sled,
            output_file: "gas-price.json".to_string(),
            purge_period: Duration::from_secs(PURGE_PERIOD_SECS),
            dump_period: Duration::from_secs(DUMP_PERIOD_SECS),
            max_age: MAX_AGE_SECS,
            max_disconnect: MAX_DISCONNECT_SECS,
            watchdog_interval: Duration::from_secs(1),
            stats_block_count: STATS_BLOCK_COUNT,
            poll_interval: Duration::from_millis(1_000),
            channel_capacity: 4096,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, keeping the default for missing or
    /// unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Config::default();
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(parse_or(&lookup, key, default.as_secs()))
        };

        Self {
            host: lookup("HOST").unwrap_or(d.host),
            port: parse_or(&lookup, "PORT", d.port),
            rpc_url: lookup("RPC_URL").unwrap_or(d.rpc_url),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            store_backend: parse_or(&lookup, "STORE_BACKEND", d.store_backend),
            output_file: lookup("OUTPUT_FILE").unwrap_or(d.output_file),
            purge_period: secs("PURGE_PERIOD_SECS", d.purge_period),
            dump_period: secs("DUMP_PERIOD_SECS", d.dump_period),
            max_age: parse_or(&lookup, "MAX_AGE_SECS", d.max_age),
            max_disconnect: parse_or(&lookup, "MAX_DISCONNECT_SECS", d.max_disconnect),
            watchdog_interval: secs("WATCHDOG_INTERVAL_SECS", d.watchdog_interval),
            stats_block_count: parse_or(&lookup, "STATS_BLOCK_COUNT", d.stats_block_count),
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "POLL_INTERVAL_MS",
                d.poll_interval.as_millis() as u64,
            )),
            channel_capacity: parse_or(&lookup, "CHANNEL_CAPACITY", d.channel_capacity).max(1),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_file)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {key}={raw:?}; using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_documented_periods() {
        let config = config_with(&[]);
        assert_eq!(config.purge_period, Duration::from_secs(60));
        assert_eq!(config.dump_period, Duration::from_secs(20));
        assert_eq!(config.max_age, 2 * 24 * 60 * 60);
        assert_eq!(config.max_disconnect, 10);
        assert_eq!(config.stats_block_count, 100);
        assert_eq!(config.store_backend, StoreBackend::Sled);
        assert_eq!(config.output_path(), PathBuf::from("./database/gas-price.json"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_with(&[
            ("PORT", "9000"),
            ("STORE_BACKEND", "Memory"),
            ("MAX_AGE_SECS", "3600"),
            ("POLL_INTERVAL_MS", "250"),
            ("DATA_DIR", "/tmp/gas"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.max_age, 3600);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.output_path(), PathBuf::from("/tmp/gas/gas-price.json"));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_with(&[("PORT", "eighty"), ("STORE_BACKEND", "rocks")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Sled);
    }
}
