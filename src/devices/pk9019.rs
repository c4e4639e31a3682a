use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;

use super::traits::{Device, DeviceData};
use crate::modbus::client::ModbusClientTrait;
use crate::utils::error::ModbusError;

/// PK9019 register map, from the vendor manual's request examples.
const ENV_TEMP_REGISTER: u16 = 0x0001;
const ENV_TEMP_COUNT: u16 = 1;
const CHANNEL_TEMP_REGISTER: u16 = 0x0002;
pub const CHANNEL_COUNT: u16 = 8;

/// Raw value a channel reports when no thermocouple is attached.
const DISCONNECTED_SENTINEL: u16 = 0x5555;

/// One thermocouple channel: a temperature in tenths of a degree, or the
/// disconnected sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelReading {
    Disconnected,
    Celsius(f32),
}

impl ChannelReading {
    fn from_raw(raw: u16) -> Self {
        if raw == DISCONNECTED_SENTINEL {
            ChannelReading::Disconnected
        } else {
            ChannelReading::Celsius(raw as f32 / 10.0)
        }
    }
}

impl fmt::Display for ChannelReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelReading::Disconnected => write!(f, "disconnected"),
            ChannelReading::Celsius(t) => write!(f, "{:.1} °C", t),
        }
    }
}

/// 8-channel thermocouple/temperature multiplexer.
#[derive(Debug, Clone)]
pub struct Pk9019Device {
    pub slave_address: u8,
    pub name: String,
}

impl Pk9019Device {
    pub fn new(slave_address: u8, name: String) -> Self {
        Self {
            slave_address,
            name,
        }
    }

    /// Environment (cold-junction) temperature.
    ///
    /// This register reports whole degrees; unlike the channel registers it
    /// is NOT in tenths, so no division by 10 here.
    pub async fn read_environment_temp(
        &self,
        client: &dyn ModbusClientTrait,
    ) -> Result<f32, ModbusError> {
        let registers = client
            .read_holding_registers(self.slave_address, ENV_TEMP_REGISTER, ENV_TEMP_COUNT)
            .await?;
        Ok(registers[0] as f32)
    }

    /// All 8 thermocouple channels in one read.
    pub async fn read_channel_temps(
        &self,
        client: &dyn ModbusClientTrait,
    ) -> Result<Vec<ChannelReading>, ModbusError> {
        let registers = client
            .read_holding_registers(self.slave_address, CHANNEL_TEMP_REGISTER, CHANNEL_COUNT)
            .await?;

        let readings: Vec<ChannelReading> = registers
            .iter()
            .take(CHANNEL_COUNT as usize)
            .map(|&raw| ChannelReading::from_raw(raw))
            .collect();

        for (i, reading) in readings.iter().enumerate() {
            debug!("Channel {}: {}", i, reading);
        }
        Ok(readings)
    }
}

#[async_trait]
impl Device for Pk9019Device {
    fn device_type(&self) -> &str {
        "pk9019"
    }

    fn slave_address(&self) -> u8 {
        self.slave_address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn read_data(
        &self,
        client: &dyn ModbusClientTrait,
    ) -> Result<Box<dyn DeviceData>, ModbusError> {
        info!("📊 Polling PK9019 '{}' (slave {})", self.name, self.slave_address);

        let environment_temp = self.read_environment_temp(client).await?;
        let channels = self.read_channel_temps(client).await?;

        Ok(Box::new(Pk9019Data {
            device_address: self.slave_address,
            device_name: self.name.clone(),
            timestamp: Utc::now(),
            environment_temp,
            channels,
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pk9019Data {
    pub device_address: u8,
    pub device_name: String,
    pub timestamp: DateTime<Utc>,
    pub environment_temp: f32,
    pub channels: Vec<ChannelReading>,
}

impl DeviceData for Pk9019Data {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn device_address(&self) -> u8 {
        self.device_address
    }

    fn device_type(&self) -> String {
        "pk9019".to_string()
    }

    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn get_all_parameters(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "EnvironmentTemp".to_string(),
            format!("{:.0} °C", self.environment_temp),
        )];
        for (i, channel) in self.channels.iter().enumerate() {
            params.push((format!("Channel{}", i + 1), channel.to_string()));
        }
        params
    }

    fn clone_box(&self) -> Box<dyn DeviceData> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient;

    #[async_trait]
    impl ModbusClientTrait for FixedClient {
        async fn read_holding_registers(
            &self,
            _slave_id: u8,
            start_register: u16,
            _count: u16,
        ) -> Result<Vec<u16>, ModbusError> {
            match start_register {
                ENV_TEMP_REGISTER => Ok(vec![250]),
                CHANNEL_TEMP_REGISTER => {
                    Ok(vec![123, 0x5555, 300, 250, 0, 1000, 0x5555, 5])
                }
                other => Err(ModbusError::InvalidData(format!(
                    "unexpected register {:#06x}",
                    other
                ))),
            }
        }
    }

    #[tokio::test]
    async fn test_environment_temp_is_unscaled() {
        let device = Pk9019Device::new(1, "mux".to_string());
        let temp = device.read_environment_temp(&FixedClient).await.unwrap();
        // Raw 250 means 250 °C-units, not 25.0.
        assert_eq!(temp, 250.0);
    }

    #[tokio::test]
    async fn test_channel_temps_scaling_and_sentinel() {
        let device = Pk9019Device::new(1, "mux".to_string());
        let channels = device.read_channel_temps(&FixedClient).await.unwrap();
        assert_eq!(channels.len(), 8);
        assert_eq!(channels[0], ChannelReading::Celsius(12.3));
        assert_eq!(channels[1], ChannelReading::Disconnected);
        assert_eq!(channels[2], ChannelReading::Celsius(30.0));
        assert_eq!(channels[6], ChannelReading::Disconnected);
        assert_eq!(channels[7], ChannelReading::Celsius(0.5));
    }

    #[tokio::test]
    async fn test_read_data_snapshot() {
        let device = Pk9019Device::new(1, "mux".to_string());
        let data = device.read_data(&FixedClient).await.unwrap();
        let snapshot = data.as_any().downcast_ref::<Pk9019Data>().unwrap();
        assert_eq!(snapshot.environment_temp, 250.0);
        assert_eq!(snapshot.channels[1], ChannelReading::Disconnected);

        let params = data.get_all_parameters();
        assert_eq!(params[0], ("EnvironmentTemp".to_string(), "250 °C".to_string()));
        assert_eq!(params[2], ("Channel2".to_string(), "disconnected".to_string()));
    }

    #[tokio::test]
    async fn test_idempotent_decode() {
        let device = Pk9019Device::new(1, "mux".to_string());
        let first = device.read_channel_temps(&FixedClient).await.unwrap();
        let second = device.read_channel_temps(&FixedClient).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_channel_json_shape() {
        let reading = ChannelReading::Celsius(30.0);
        assert_eq!(serde_json::to_value(reading).unwrap(), serde_json::json!(30.0));
        let reading = ChannelReading::Disconnected;
        assert_eq!(serde_json::to_value(reading).unwrap(), serde_json::Value::Null);
    }
}
