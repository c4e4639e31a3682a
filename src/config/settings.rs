use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::modbus::client::ClientOptions;
use crate::modbus::frame::CrcMode;
use crate::utils::error::ModbusError;

pub const DEVICE_TYPE_PK9019: &str = "pk9019";
pub const DEVICE_TYPE_TEMP_HUMIDITY: &str = "temp_humidity";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Polling settings
    pub poll_interval_seconds: u64,

    // Connection settings
    pub connect_timeout_seconds: u64,
    pub response_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,

    // Opt-in strictness: reject frames whose CRC trailer does not match.
    #[serde(default)]
    pub verify_response_crc: bool,

    // Device configuration
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,            // Device name
    pub device_type: String,     // "pk9019" or "temp_humidity"
    pub host: String,            // Device IP address
    pub port: u16,               // TCP port, usually 502
    pub slave_address: u8,       // Modbus slave address
    pub enabled: bool,           // Whether device is polled
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 10,
            // Defaults carried over from the deployed collector
            connect_timeout_seconds: 10,
            response_timeout_seconds: 10,
            max_retries: 3,
            retry_delay_ms: 500,
            verify_response_crc: false,
            devices: vec![
                DeviceConfig {
                    name: "Thermocouple Mux".to_string(),
                    device_type: DEVICE_TYPE_PK9019.to_string(),
                    host: "192.168.1.100".to_string(),
                    port: 502,
                    slave_address: 1,
                    enabled: true,
                },
                DeviceConfig {
                    name: "Cabinet Probe".to_string(),
                    device_type: DEVICE_TYPE_TEMP_HUMIDITY.to_string(),
                    host: "192.168.1.101".to_string(),
                    port: 502,
                    slave_address: 1,
                    enabled: true,
                },
            ],
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ModbusError::ConfigError(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ModbusError::ConfigError(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ModbusError::ConfigError(format!("mkdir failed: {}", e)))?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ModbusError::ConfigError(format!("serialize failed: {}", e)))?;
        std::fs::write(&path, content).map_err(|e| {
            ModbusError::ConfigError(format!(
                "failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        info!("💾 Configuration written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.devices.is_empty() {
            warn!("No devices configured, nothing will be polled");
        }
        for device in &self.devices {
            if device.port == 0 {
                return Err(ModbusError::ConfigError(format!(
                    "device '{}': port must be non-zero",
                    device.name
                )));
            }
            if device.host.trim().is_empty() {
                return Err(ModbusError::ConfigError(format!(
                    "device '{}': host must not be empty",
                    device.name
                )));
            }
            match device.device_type.as_str() {
                DEVICE_TYPE_PK9019 | DEVICE_TYPE_TEMP_HUMIDITY => {}
                other => {
                    return Err(ModbusError::ConfigError(format!(
                        "device '{}': unknown device_type '{}'",
                        device.name, other
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn get_enabled_devices(&self) -> Vec<&DeviceConfig> {
        self.devices.iter().filter(|d| d.enabled).collect()
    }

    /// Session options shared by every device connection.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            response_timeout: Duration::from_secs(self.response_timeout_seconds),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            crc_mode: if self.verify_response_crc {
                CrcMode::Strict
            } else {
                CrcMode::Lenient
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_enabled_devices().len(), 2);
        assert_eq!(config.client_options().crc_mode, CrcMode::Lenient);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.devices.len(), config.devices.len());
        assert_eq!(parsed.devices[0].device_type, DEVICE_TYPE_PK9019);
        assert_eq!(parsed.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_unknown_device_type_rejected() {
        let mut config = Config::default();
        config.devices[0].device_type = "flowmeter".to_string();
        assert!(matches!(
            config.validate(),
            Err(ModbusError::ConfigError(_))
        ));
    }

    #[test]
    fn test_strict_crc_flag() {
        let mut config = Config::default();
        config.verify_response_crc = true;
        assert_eq!(config.client_options().crc_mode, CrcMode::Strict);
    }

    #[test]
    fn test_verify_crc_defaults_off_when_absent() {
        let text = r#"
            poll_interval_seconds = 5
            connect_timeout_seconds = 10
            response_timeout_seconds = 10
            max_retries = 3
            retry_delay_ms = 500

            [[devices]]
            name = "mux"
            device_type = "pk9019"
            host = "10.0.0.5"
            port = 502
            slave_address = 1
            enabled = true
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert!(!config.verify_response_crc);
        assert!(config.validate().is_ok());
    }
}
