//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;

use smarttrack_app::services::connection_supervisor::SupervisorConfig;

/// Configuration for the BLE radio and the connection state machine it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Which host adapter to use when several are present.
    pub adapter_index: usize,
    /// How long to wait for the adapter to power on, in milliseconds.
    pub power_on_timeout_ms: u64,
    /// How long scanning plus connecting may take, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Duration of a discovery scan, in seconds.
    pub discovery_window_secs: u64,
    /// Reconnect to the remembered device on startup.
    pub auto_connect: bool,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            power_on_timeout_ms: 3_000,
            connect_timeout_ms: 10_000,
            discovery_window_secs: 3,
            auto_connect: true,
        }
    }
}

impl BleConfig {
    /// Timing knobs for the connection supervisor.
    #[must_use]
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            power_on_timeout: Duration::from_millis(self.power_on_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            discovery_window: Duration::from_secs(self.discovery_window_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_reference_timeouts() {
        let config = BleConfig::default().supervisor_config();
        assert_eq!(config, SupervisorConfig::default());
    }

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: BleConfig = toml::from_str("connect_timeout_ms = 5000").unwrap();
        assert_eq!(config.connect_timeout_ms, 5_000);
        assert_eq!(config.power_on_timeout_ms, 3_000);
        assert!(config.auto_connect);
    }
}
